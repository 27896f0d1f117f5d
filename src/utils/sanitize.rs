use serde_json::Value;

/// Sanitizes sensitive fields in JSON payloads for logging
pub fn sanitize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sanitized = serde_json::Map::new();
            for (key, val) in map {
                let sanitized_val = if is_sensitive_field(key) {
                    mask_value(val)
                } else {
                    sanitize_json(val)
                };
                sanitized.insert(key.clone(), sanitized_val);
            }
            Value::Object(sanitized)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sanitize_json).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_field(key: &str) -> bool {
    matches!(
        key.to_lowercase().as_str(),
        "account"
            | "customeraccount"
            | "counterpartyaccount"
            | "beneficiaryaccount"
            | "orderingcustomeraccount"
            | "strsaaccount"
            | "strcaaccount"
            | "cardnumber"
            | "partykey"
            | "email"
            | "senderemail"
            | "recipientemail"
            | "certapayaccount"
            | "wiretag50"
            | "wiretag59"
            | "tag50"
    )
}

fn mask_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(mask_identifier(s)),
        Value::Null => Value::Null,
        _ => Value::String("****".to_string()),
    }
}

/// Masks an identifier for logs, keeping the first and last four characters
/// of long values.
pub fn mask_identifier(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 8 {
        let start: String = chars[..4].iter().collect();
        let end: String = chars[chars.len() - 4..].iter().collect();
        format!("{}****{}", start, end)
    } else {
        "****".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mask_identifier() {
        assert_eq!(mask_identifier("4500123456781234"), "4500****1234");
        assert_eq!(mask_identifier("ACC1"), "****");
        assert_eq!(mask_identifier("marie.tremblay@example.com"), "mari****.com");
    }

    #[test]
    fn test_sanitize_card_number() {
        let input = json!({
            "cardNumber": "4500123456781234",
            "amount": "100.00"
        });

        let sanitized = sanitize_json(&input);
        let card = sanitized["cardNumber"].as_str().unwrap();

        assert_eq!(card, "4500****1234");
        assert_eq!(sanitized["amount"], "100.00");
    }

    #[test]
    fn test_sanitize_nested() {
        let input = json!({
            "identifiers": {
                "partyKey": "PK-000123456",
                "certapayAccount": "someone@example.com"
            },
            "name": { "surname": "Tremblay" },
            "startingActions": [ { "account": "000123456789" } ]
        });

        let sanitized = sanitize_json(&input);
        assert!(sanitized["identifiers"]["partyKey"].as_str().unwrap().contains("****"));
        assert!(sanitized["identifiers"]["certapayAccount"]
            .as_str()
            .unwrap()
            .contains("****"));
        assert_eq!(sanitized["name"]["surname"], "Tremblay");
        assert_eq!(sanitized["startingActions"][0]["account"], "0001****6789");
    }

    #[test]
    fn test_null_stays_null() {
        let sanitized = sanitize_json(&json!({ "account": null }));
        assert!(sanitized["account"].is_null());
    }
}
