//! Naming helpers for association declarations (English-centric)

/// Simple singularization: `addresses` -> `address`, `categories` -> `category`
pub fn singularize(name: &str) -> String {
    if name.ends_with("ies") && name.len() > 3 {
        format!("{}y", &name[..name.len() - 3])
    } else if name.ends_with("sses")
        || name.ends_with("ches")
        || name.ends_with("shes")
        || name.ends_with("xes")
        || name.ends_with("zes")
    {
        name[..name.len() - 2].to_string()
    } else if name.ends_with("ss") {
        name.to_string()
    } else if name.ends_with('s') && name.len() > 1 {
        name[..name.len() - 1].to_string()
    } else {
        name.to_string()
    }
}

/// Convert snake_case to PascalCase: `line_items` -> `LineItems`
pub fn camelize(s: &str) -> String {
    s.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Convert PascalCase to snake_case: `LineItem` -> `line_item`
pub fn underscore(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;
    for ch in s.chars() {
        if ch.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

/// Default foreign key for an owner model: `Billing::Customer` -> `customer_id`
pub fn foreign_key_for(model: &str) -> String {
    format!("{}_id", underscore(demodulize(model)))
}

/// Default target class name for an association: `line_items` -> `LineItem`
pub fn class_name_for(association: &str) -> String {
    camelize(&singularize(association))
}

/// Strip any namespace from a model name: `Billing::Customer` -> `Customer`
pub fn demodulize(model: &str) -> &str {
    model.rsplit("::").next().unwrap_or(model)
}

/// Namespace of a model name, if any: `Billing::Customer` -> `Billing`
pub fn parent_namespace(model: &str) -> Option<&str> {
    model.rfind("::").map(|idx| &model[..idx])
}
