use regex::Regex;

/// Placeholder substitution against the event payload.
///
/// The real shortcode engine lives in the host platform; workflows only need
/// `replace`. `TemplateService` is the built-in implementation covering the
/// `{{field}}` / `{field}` token styles with dotted-path lookup.
#[cfg_attr(test, mockall::automock)]
pub trait ShortcodeService: Send + Sync {
    fn replace(&self, template: &str, event: &serde_json::Value) -> String;
}

#[derive(Debug, Clone)]
pub struct TemplateService {
    double_brace: Regex,
    single_brace: Regex,
}

impl TemplateService {
    pub fn new() -> Self {
        Self {
            double_brace: Regex::new(r"\{\{([^{}]+)\}\}").unwrap(),
            single_brace: Regex::new(r"\{([A-Za-z0-9_.]+)\}").unwrap(),
        }
    }

    fn substitute(&self, re: &Regex, template: &str, event: &serde_json::Value) -> String {
        let mut result = template.to_string();

        for cap in re.captures_iter(template) {
            let var_path = cap[1].trim();

            // Unknown tokens are left untouched
            if let Some(value) = get_nested_value(event, var_path) {
                let replacement = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::Bool(b) => b.to_string(),
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                result = result.replace(&cap[0], &replacement);
            }
        }

        result
    }
}

impl Default for TemplateService {
    fn default() -> Self {
        Self::new()
    }
}

impl ShortcodeService for TemplateService {
    fn replace(&self, template: &str, event: &serde_json::Value) -> String {
        let pass = self.substitute(&self.double_brace, template, event);
        self.substitute(&self.single_brace, &pass, event)
    }
}

fn get_nested_value(json: &serde_json::Value, path: &str) -> Option<serde_json::Value> {
    let mut current = json;

    for part in path.split('.') {
        match current.get(part) {
            Some(v) => current = v,
            None => return None,
        }
    }

    Some(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_double_brace_substitution() {
        let service = TemplateService::new();
        let event = json!({"customer": {"name": "Ada", "email": "ada@example.com"}});

        let out = service.replace("Hi {{customer.name}} <{{customer.email}}>", &event);
        assert_eq!(out, "Hi Ada <ada@example.com>");
    }

    #[test]
    fn test_single_brace_substitution() {
        let service = TemplateService::new();
        let event = json!({"appointment_id": 42});

        assert_eq!(service.replace("Booking #{appointment_id}", &event), "Booking #42");
    }

    #[test]
    fn test_unknown_token_left_untouched() {
        let service = TemplateService::new();
        let event = json!({"workflow": "booking"});

        assert_eq!(
            service.replace("{{missing.field}} and {other}", &event),
            "{{missing.field}} and {other}"
        );
    }

    #[test]
    fn test_null_renders_empty() {
        let service = TemplateService::new();
        let event = json!({"note": null});

        assert_eq!(service.replace("n:{{note}}", &event), "n:");
    }
}
