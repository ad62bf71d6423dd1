//! Output type resolution by sampling.
//!
//! The kind a chain produces is only known once it runs against real data,
//! so the resolver builds a throwaway closure for the chain and runs it
//! against the first element of the sample. Sampling reads through a slice
//! and never consumes the source.

use crate::{ast::ValueChain, compiler::emit_chain, value::Value, value::ValueKind};

/// The kind `chain` produces for the first sampled element.
///
/// Returns `None` for an empty sample or when the chain fails on that
/// element; both mean "unknown" and never an error.
pub fn resolve_kind(chain: &ValueChain, sample: &[Value]) -> Option<ValueKind> {
    let first = sample.first()?;
    emit_chain(chain)(first).ok().map(|value| value.kind())
}

/// The kind `chain` is declared or sampled to produce: its `as` cast when it
/// has one, else the sampled kind.
pub fn output_kind(chain: &ValueChain, sample: &[Value]) -> Option<ValueKind> {
    chain.out_cast.or_else(|| resolve_kind(chain, sample))
}

/// The sampled shape of `chains`, one entry per chain.
///
/// Each entry is the kind the chain produces before its `as` cast, or `?`
/// when unknown. Everything the compiler decides from the sample follows
/// from this text together with the chains themselves, so two sources with
/// the same signature compile to the same artifact.
pub fn signature<'c>(chains: impl IntoIterator<Item = &'c ValueChain>, sample: &[Value]) -> String {
    let kinds: Vec<&str> = chains
        .into_iter()
        .map(|chain| {
            let uncast = ValueChain {
                out_cast: None,
                ..chain.clone()
            };
            resolve_kind(&uncast, sample).map_or("?", ValueKind::name)
        })
        .collect();
    kinds.join(",")
}

/// The single kind shared by every resolved field, if there is one.
///
/// Any unknown field, a `null` sample value or a mix of kinds yields `None`,
/// which selects the type-erased row.
pub fn resolve_uniform(kinds: &[Option<ValueKind>]) -> Option<ValueKind> {
    let (first, rest) = kinds.split_first()?;
    let kind = (*first)?;
    if kind == ValueKind::Null {
        return None;
    }
    rest.iter().all(|k| *k == Some(kind)).then_some(kind)
}
