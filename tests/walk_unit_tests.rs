//! Unit tests for document tree traversal

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use devrig::walk::walk;
    use serde_yaml::Value;

    fn doc(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn replaces_matching_string_leaves_in_place() {
        let mut doc = doc("images:\n  app:\n    image: OLD\n    tags:\n      - OLD\n      - keep\n");
        walk(
            &mut doc,
            &|_path, _key, value| value == "OLD",
            &mut |_path, _value| Ok(Value::String("new".to_owned())),
        )
        .unwrap();

        let out = serde_yaml::to_string(&doc).unwrap();
        assert!(out.contains("image: new"));
        assert!(out.contains("- new"));
        assert!(out.contains("- keep"));
    }

    #[test]
    fn paths_are_slash_separated_with_indices() {
        let mut doc = doc("deployments:\n  - name: one\n    helm:\n      chart: stable\n");
        let mut seen = Vec::new();
        walk(
            &mut doc,
            &|_path, _key, _value| true,
            &mut |path, value| {
                seen.push(path.to_owned());
                Ok(Value::String(value.to_owned()))
            },
        )
        .unwrap();

        assert_eq!(seen, ["deployments/0/name", "deployments/0/helm/chart"]);
    }

    #[test]
    fn key_is_the_final_path_segment() {
        let mut doc = doc("a:\n  b: x\n");
        walk(
            &mut doc,
            &|path, key, _value| {
                assert_eq!(path, "a/b");
                assert_eq!(key, "b");
                true
            },
            &mut |_path, value| Ok(Value::String(value.to_owned())),
        )
        .unwrap();
    }

    #[test]
    fn non_string_scalars_are_never_matched() {
        let mut doc = doc("port: 8080\nenabled: true\nempty: null\nname: x\n");
        // the matcher is a plain Fn, so collection needs interior mutability
        let matched = std::cell::RefCell::new(Vec::new());
        walk(
            &mut doc,
            &|_path, _key, value| {
                matched.borrow_mut().push(value.to_owned());
                false
            },
            &mut |_path, value| Ok(Value::String(value.to_owned())),
        )
        .unwrap();

        assert_eq!(matched.into_inner(), ["x"]);
    }

    #[test]
    fn replacement_may_change_the_node_kind() {
        let mut doc = doc("values: PLACEHOLDER\n");
        walk(
            &mut doc,
            &|_path, _key, value| value == "PLACEHOLDER",
            &mut |_path, _value| Ok(serde_yaml::from_str("a: 1\nb: 2\n").unwrap()),
        )
        .unwrap();

        assert!(doc.get("values").unwrap().is_mapping());
    }

    #[test]
    fn first_error_aborts_the_walk() {
        let mut doc = doc("a: x\nb: y\nc: z\n");
        let mut calls = 0;
        let result = walk(
            &mut doc,
            &|_path, _key, _value| true,
            &mut |_path, _value| {
                calls += 1;
                Err(anyhow::anyhow!("stop"))
            },
        );

        assert!(result.is_err());
        assert_eq!(calls, 1);
        // untouched values remain
        assert_eq!(doc.get("b"), Some(&Value::String("y".to_owned())));
    }
}
