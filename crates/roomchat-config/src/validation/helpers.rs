//! Shared validation helpers.

/// Push an error if `value` is outside `[min, max]`.
pub(crate) fn validate_range(errors: &mut Vec<String>, name: &str, value: u32, min: u32, max: u32) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

/// Push an error if `value` is longer than `max` characters.
pub(crate) fn validate_max_len(errors: &mut Vec<String>, name: &str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        errors.push(format!("{name} is {len} characters, maximum is {max}"));
    }
}

/// Push an error unless `value` starts with one of `schemes` and has a host.
pub(crate) fn validate_url_scheme(
    errors: &mut Vec<String>,
    name: &str,
    value: &str,
    schemes: &[&str],
) {
    let rest = schemes.iter().find_map(|s| value.strip_prefix(s));
    match rest {
        Some(rest) if !rest.is_empty() && !rest.starts_with('/') => {}
        Some(_) => errors.push(format!("{name} = {value:?} has no host")),
        None => errors.push(format!(
            "{name} = {value:?} must start with one of {}",
            schemes.join(", ")
        )),
    }
}
