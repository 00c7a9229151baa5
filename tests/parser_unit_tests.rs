//! Unit tests for variable placeholder parsing

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use devrig::vars::{convert_string_value, parse_string, value_to_string};
    use serde_yaml::Value;

    fn resolve_fixed(value: &str, name: &str, resolved: Value) -> Value {
        let expected = name.to_owned();
        parse_string(value, &mut |n| {
            assert_eq!(n, expected);
            Ok(resolved.clone())
        })
        .unwrap()
    }

    #[test]
    fn substitutes_a_single_token() {
        let result = resolve_fixed("${NAME}", "NAME", Value::String("app".to_owned()));
        assert_eq!(result, Value::String("app".to_owned()));
    }

    #[test]
    fn concatenates_around_tokens() {
        let result = resolve_fixed(
            "registry/${NAME}:latest",
            "NAME",
            Value::String("app".to_owned()),
        );
        assert_eq!(result, Value::String("registry/app:latest".to_owned()));
    }

    #[test]
    fn whole_string_token_keeps_native_type() {
        let result = resolve_fixed("${PORT}", "PORT", Value::Number(8080.into()));
        assert_eq!(result, Value::Number(8080.into()));

        let result = resolve_fixed("${FLAG}", "FLAG", Value::Bool(true));
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn embedded_token_stringifies() {
        let result = resolve_fixed("port-${PORT}", "PORT", Value::Number(8080.into()));
        assert_eq!(result, Value::String("port-8080".to_owned()));
    }

    #[test]
    fn stringify_modifier_forces_string_result() {
        let result = resolve_fixed("$!{PORT}", "PORT", Value::Number(8080.into()));
        assert_eq!(result, Value::String("8080".to_owned()));
    }

    #[test]
    fn concatenation_result_is_coerced() {
        // substitution yields "80" + "80" = "8080" which parses as an integer
        let result = parse_string("${A}${B}", &mut |_| Ok(Value::String("80".to_owned()))).unwrap();
        assert_eq!(result, Value::Number(8080.into()));

        let result = parse_string("tr${REST}", &mut |_| Ok(Value::String("ue".to_owned()))).unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn double_dollar_escapes_without_resolving() {
        let result = parse_string("$${Test}", &mut |_| {
            panic!("resolver must not be called for escapes")
        })
        .unwrap();
        assert_eq!(result, Value::String("${Test}".to_owned()));
    }

    #[test]
    fn each_extra_dollar_survives_the_escape() {
        let result = parse_string("$$${Test}", &mut |_| {
            panic!("resolver must not be called for escapes")
        })
        .unwrap();
        assert_eq!(result, Value::String("$${Test}".to_owned()));
    }

    #[test]
    fn escaped_stringify_token_keeps_modifier() {
        let result = parse_string("$$!{Test}", &mut |_| {
            panic!("resolver must not be called for escapes")
        })
        .unwrap();
        assert_eq!(result, Value::String("$!{Test}".to_owned()));
    }

    #[test]
    fn plain_strings_pass_through_untouched() {
        let result = parse_string("no variables here", &mut |_| {
            panic!("resolver must not be called")
        })
        .unwrap();
        assert_eq!(result, Value::String("no variables here".to_owned()));

        // a lone dollar is not a token
        let result = parse_string("cost: $5", &mut |_| panic!("resolver must not be called"))
            .unwrap();
        assert_eq!(result, Value::String("cost: $5".to_owned()));
    }

    #[test]
    fn token_name_is_trimmed() {
        let result = parse_string("${ NAME }", &mut |name| {
            assert_eq!(name, "NAME");
            Ok(Value::String("ok".to_owned()))
        })
        .unwrap();
        assert_eq!(result, Value::String("ok".to_owned()));
    }

    #[test]
    fn unterminated_placeholder_is_an_error() {
        let result = parse_string("${NAME", &mut |_| Ok(Value::Null));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unterminated variable placeholder"));
    }

    #[test]
    fn resolver_errors_abort_immediately() {
        let mut calls = 0;
        let result = parse_string("${A} ${B}", &mut |_| {
            calls += 1;
            Err(anyhow::anyhow!("boom"))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn convert_string_value_coercions() {
        assert_eq!(convert_string_value("42"), Value::Number(42.into()));
        assert_eq!(convert_string_value("-7"), Value::Number((-7).into()));
        assert_eq!(convert_string_value("true"), Value::Bool(true));
        assert_eq!(convert_string_value("false"), Value::Bool(false));
        assert_eq!(
            convert_string_value("1.5"),
            Value::String("1.5".to_owned())
        );
        assert_eq!(
            convert_string_value("True"),
            Value::String("True".to_owned())
        );
    }

    #[test]
    fn value_to_string_renders_scalars() {
        assert_eq!(value_to_string(&Value::String("x".to_owned())), "x");
        assert_eq!(value_to_string(&Value::Number(3.into())), "3");
        assert_eq!(value_to_string(&Value::Bool(false)), "false");
        assert_eq!(value_to_string(&Value::Null), "null");
    }
}
