//! # postbox-codegen
//!
//! Emits the Rust source for the typed mailbox family.
//!
//! Rust has no variadic generics, so every argument count a mailbox can
//! carry gets its own block of glue: the `MailboxArgs` impl for the
//! argument tuple, the `TypedMailbox::new` constructor taking an N-argument
//! handler, and the N-argument `MailboxAddress::send`. Everything else lives
//! once in hand-written generic code in the `postbox` crate.
//!
//! The output is a pure function of the requested maximum arity. The
//! `postbox` build script writes it to `OUT_DIR`; the `postbox-codegen`
//! binary prints it to stdout for inspection.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

/// Largest number of arguments a typed mailbox supports.
pub const MAX_ARITY: usize = 14;

/// Emit the complete generated unit for arities `0..=max`.
///
/// `max` is clamped to [`MAX_ARITY`]. Blocks appear in ascending arity order
/// between the preamble and the footer.
pub fn emit(max: usize) -> String {
    let max = max.min(MAX_ARITY);
    let mut out = preamble(max);
    out.push_str(&poison());
    for arity in 0..=max {
        if let Some(block) = emit_arity(arity) {
            out.push_str(&block);
        }
    }
    out.push_str(&footer(max));
    tracing::debug!(max, bytes = out.len(), "typed mailbox unit emitted");
    out
}

/// Banner and imports.
pub fn preamble(max: usize) -> String {
    format!(
        "// @generated by postbox-codegen for arities 0..={max}. Do not edit.\n\
         //\n\
         // Written by the `postbox` build script on every build.\n\
         \n\
         use std::rc::Rc;\n\
         \n\
         use super::sealed::Sealed;\n\
         use super::{{MailboxAddress, MailboxArg, TypedMailbox}};\n\
         use crate::{{ArgReader, ArgWriter, CodecError, MailboxTransport, MessagingError}};\n",
        max = max.min(MAX_ARITY),
    )
}

/// The `MailboxArgs` trait every specialization implements.
///
/// Any type without a generated impl is rejected at the use site with the
/// `on_unimplemented` message.
pub fn poison() -> String {
    format!(
        r#"
/// Argument list of a typed mailbox: a tuple of up to {MAX_ARITY} [`MailboxArg`] types.
///
/// The tuple order is the handler's parameter order and the order the
/// arguments travel in. Implemented only for the generated tuples.
#[diagnostic::on_unimplemented(
    message = "`{{Self}}` is not a mailbox argument list",
    label = "expected a tuple of at most {MAX_ARITY} mailbox arguments",
    note = "bind the mailbox to a tuple of argument types, e.g. `TypedMailbox<(u64, String)>`"
)]
pub trait MailboxArgs: Sealed + Sized + 'static {{
    /// Number of arguments.
    const ARITY: usize;

    /// Encode every argument in declared order.
    fn write_args(&self, out: &mut ArgWriter<'_>) -> Result<(), CodecError>;

    /// Decode exactly `ARITY` arguments in declared order.
    fn read_args(input: &mut ArgReader<'_>) -> Result<Self, CodecError>;
}}
"#
    )
}

/// The `MAX_ARITY` constant and closing marker.
pub fn footer(max: usize) -> String {
    format!(
        "\n/// Largest arity with a generated specialization.\n\
         pub const MAX_ARITY: usize = {max};\n\
         \n\
         // End of generated mailbox specializations.\n",
        max = max.min(MAX_ARITY),
    )
}

/// Source of the specialization for exactly `arity` arguments.
///
/// Returns `None` above [`MAX_ARITY`].
pub fn emit_arity(arity: usize) -> Option<String> {
    if arity > MAX_ARITY {
        return None;
    }
    let slots = Slots::new(arity);
    let mut out = String::new();

    out.push_str(&format!("\n// Arity {arity}.\n\n"));
    out.push_str(&format!(
        "{impl_} Sealed for {tuple} {{}}\n\n",
        impl_ = slots.impl_header(),
        tuple = slots.tuple_type(),
    ));
    out.push_str(&args_impl(&slots));
    out.push_str(&constructor_impl(&slots));
    out.push_str(&send_impl(&slots));
    Some(out)
}

/// Names derived from one arity.
struct Slots {
    arity: usize,
    types: Vec<String>,
    values: Vec<String>,
}

impl Slots {
    fn new(arity: usize) -> Self {
        Self {
            arity,
            types: (0..arity).map(|i| format!("A{i}")).collect(),
            values: (0..arity).map(|i| format!("a{i}")).collect(),
        }
    }

    /// `impl` for arity 0, `impl<A0: MailboxArg, ..>` otherwise.
    fn impl_header(&self) -> String {
        if self.arity == 0 {
            return "impl".to_string();
        }
        let bounds: Vec<String> = self
            .types
            .iter()
            .map(|t| format!("{t}: MailboxArg"))
            .collect();
        format!("impl<{}>", bounds.join(", "))
    }

    fn tuple_type(&self) -> String {
        tuple(&self.types)
    }

    fn tuple_pattern(&self) -> String {
        tuple(&self.values)
    }

    fn plural(&self) -> &'static str {
        if self.arity == 1 { "" } else { "s" }
    }
}

/// `()`, `(x,)` or `(x, y, ..)`.
fn tuple(items: &[String]) -> String {
    match items {
        [] => "()".to_string(),
        [one] => format!("({one},)"),
        _ => format!("({})", items.join(", ")),
    }
}

fn args_impl(slots: &Slots) -> String {
    let mut out = format!(
        "{impl_} MailboxArgs for {tuple} {{\n    const ARITY: usize = {arity};\n\n",
        impl_ = slots.impl_header(),
        tuple = slots.tuple_type(),
        arity = slots.arity,
    );

    if slots.arity == 0 {
        out.push_str(
            "    fn write_args(&self, _out: &mut ArgWriter<'_>) -> Result<(), CodecError> {\n\
             \x20       Ok(())\n\
             \x20   }\n\
             \n\
             \x20   fn read_args(_input: &mut ArgReader<'_>) -> Result<Self, CodecError> {\n\
             \x20       Ok(())\n\
             \x20   }\n\
             }\n\n",
        );
        return out;
    }

    out.push_str("    fn write_args(&self, out: &mut ArgWriter<'_>) -> Result<(), CodecError> {\n");
    out.push_str(&format!("        let {} = self;\n", slots.tuple_pattern()));
    for value in &slots.values {
        out.push_str(&format!("        out.write({value})?;\n"));
    }
    out.push_str("        Ok(())\n    }\n\n");

    out.push_str("    fn read_args(input: &mut ArgReader<'_>) -> Result<Self, CodecError> {\n");
    for (value, ty) in slots.values.iter().zip(&slots.types) {
        out.push_str(&format!("        let {value} = input.read::<{ty}>()?;\n"));
    }
    out.push_str(&format!(
        "        Ok({})\n    }}\n}}\n\n",
        slots.tuple_pattern()
    ));
    out
}

fn constructor_impl(slots: &Slots) -> String {
    format!(
        "{impl_} TypedMailbox<{tuple}> {{\n\
         \x20   /// Register a mailbox on `transport` whose handler takes {arity} argument{s}.\n\
         \x20   pub fn new<F>(transport: &Rc<MailboxTransport>, handler: F) -> Self\n\
         \x20   where\n\
         \x20       F: Fn({types}) + 'static,\n\
         \x20   {{\n\
         \x20       Self::bind(transport, move |{pattern}| handler({values}))\n\
         \x20   }}\n\
         }}\n\n",
        impl_ = slots.impl_header(),
        tuple = slots.tuple_type(),
        arity = slots.arity,
        s = slots.plural(),
        types = slots.types.join(", "),
        pattern = slots.tuple_pattern(),
        values = slots.values.join(", "),
    )
}

fn send_impl(slots: &Slots) -> String {
    let mut out = format!(
        "{impl_} MailboxAddress<{tuple}> {{\n\
         \x20   /// Send {arity} argument{s} to the mailbox at this address.\n\
         \x20   ///\n\
         \x20   /// Returns once the message is queued; delivery is not confirmed.\n",
        impl_ = slots.impl_header(),
        tuple = slots.tuple_type(),
        arity = slots.arity,
        s = slots.plural(),
    );
    // self + transport + arguments
    if slots.arity + 2 > 7 {
        out.push_str("    #[allow(clippy::too_many_arguments)]\n");
    }

    let params: String = slots
        .values
        .iter()
        .zip(&slots.types)
        .map(|(value, ty)| format!(", {value}: &{ty}"))
        .collect();
    out.push_str(&format!(
        "    pub fn send(&self, transport: &MailboxTransport{params}) -> Result<(), MessagingError> {{\n"
    ));

    if slots.arity == 0 {
        out.push_str("        transport.send(&self.raw, |_out| Ok(()))\n");
    } else {
        out.push_str("        transport.send(&self.raw, |out| {\n");
        out.push_str("            let mut out = ArgWriter::new(out);\n");
        for value in &slots.values {
            out.push_str(&format!("            out.write({value})?;\n"));
        }
        out.push_str("            Ok(())\n        })\n");
    }
    out.push_str("    }\n}\n");
    out
}
