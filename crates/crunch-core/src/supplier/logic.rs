use super::{Supplier, zip_with};

/// Three-valued conjunction: a known `false` wins over absence.
pub fn and(a: Supplier<bool>, b: Supplier<bool>) -> Supplier<bool> {
    let id = format!("and({},{})", a.identifier(), b.identifier());
    zip_with(id, a, b, |x, y| match (x, y) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    })
}

/// Three-valued disjunction: a known `true` wins over absence.
pub fn or(a: Supplier<bool>, b: Supplier<bool>) -> Supplier<bool> {
    let id = format!("or({},{})", a.identifier(), b.identifier());
    zip_with(id, a, b, |x, y| match (x, y) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    })
}

pub fn not(a: Supplier<bool>) -> Supplier<bool> {
    let id = format!("not({})", a.identifier());
    a.map(id, |b| Some(!b))
}
