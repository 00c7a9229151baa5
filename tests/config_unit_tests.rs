//! Unit tests for typed configuration parsing and validation

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use devrig::cache::{LocalCache, RemoteCache};
    use devrig::config::{ConfigAggregate, RigConfig, VariableDefinition, validation::validate_config};
    use devrig::system::MockSystem;
    use serde_yaml::Value;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Arc;

    fn parse(yaml: &str) -> RigConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn full_config_parses() {
        let config = parse(
            r"
name: acme
vars:
  REGISTRY: ghcr.io/acme
  REGION:
    env: AWS_REGION
    default: us-east-1
images:
  app:
    image: ghcr.io/acme/app
    tags:
      - dev
    dockerfile: ./Dockerfile
deployments:
  - name: backend
    helm:
      chart: ./chart
      values:
        replicas: 2
hooks:
  - events: ['before:build']
    command: echo hi
pipelines:
  deploy: run_deployments backend
profiles:
  - name: staging
    patches:
      - op: replace
        path: images.app.image
        value: ghcr.io/acme/app-staging
dependencies:
  - name: shared
    path: ../shared
",
        );

        assert_eq!(config.name.as_deref(), Some("acme"));
        assert_eq!(config.vars.len(), 2);
        assert_eq!(config.images["app"].tags, ["dev"]);
        assert_eq!(config.deployments[0].name, "backend");
        assert_eq!(config.profiles[0].patches.len(), 1);
        assert_eq!(config.dependencies[0].path, "../shared");
        validate_config(&config).unwrap();
    }

    #[test]
    fn variable_shorthand_normalizes_to_a_spec() {
        let config = parse("vars:\n  PORT: 8080\n");
        let VariableDefinition::Shorthand(raw) = &config.vars["PORT"] else {
            panic!("expected shorthand definition");
        };
        assert_eq!(raw, &Value::Number(8080.into()));

        let spec = config.vars["PORT"].spec();
        assert_eq!(spec.value, Some(Value::Number(8080.into())));
        assert!(spec.env.is_none());
    }

    #[test]
    fn definition_order_is_preserved() {
        let config = parse("vars:\n  Z: 1\n  A: 2\n  M: 3\n");
        let names: Vec<&String> = config.vars.keys().collect();
        assert_eq!(names, ["Z", "A", "M"]);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<RigConfig, _> =
            serde_yaml::from_str("name: x\nbogus: true\n");
        assert!(result.is_err());
    }

    #[test]
    fn runtime_namespace_is_reserved_for_variables() {
        let config = parse("vars:\n  runtime.foo: 1\n");
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("reserved"));
    }

    #[test]
    fn conflicting_variable_sources_are_rejected() {
        let config = parse(
            "vars:\n  BAD:\n    value: x\n    env: SOME_ENV\n",
        );
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("only one of 'value', 'env' or 'command'"));

        let config = parse(
            "vars:\n  BAD:\n    command: echo hi\n    question: Really?\n",
        );
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("'question' cannot be combined"));
    }

    #[test]
    fn deployments_need_exactly_one_method() {
        let config = parse("deployments:\n  - name: both\n    helm:\n      chart: ./c\n    kubectl:\n      manifests: [a.yaml]\n");
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("cannot specify both 'helm' and 'kubectl'"));

        let config = parse("deployments:\n  - name: neither\n");
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("must specify either 'helm' or 'kubectl'"));
    }

    #[test]
    fn empty_image_names_are_rejected() {
        let config = parse("images:\n  app:\n    image: ''\n");
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("image name cannot be empty"));
    }

    #[test]
    fn hooks_need_events_and_a_command() {
        let config = parse("hooks:\n  - command: echo hi\n");
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("must list at least one event"));
    }

    #[test]
    fn replacing_the_parsed_config_shares_session_state() {
        let system = MockSystem::new();
        let aggregate = ConfigAggregate::new(
            Value::Null,
            parse("name: before\n"),
            HashMap::new(),
            Arc::new(LocalCache::empty(Path::new("/p/.devrig/cache.yaml"))),
            Arc::new(RemoteCache::load(&system, Path::new("/p/.devrig/remote.yaml"))),
            Path::new("/p/devrig.yaml"),
        );

        let updated = aggregate.with_parsed_config(parse("name: after\n"));
        assert_eq!(updated.config().name.as_deref(), Some("after"));
        assert_eq!(aggregate.config().name.as_deref(), Some("before"));

        // session maps stay shared across snapshots
        aggregate.set_variable("TAG", Value::String("v2".to_owned()));
        assert_eq!(
            updated.variable("TAG"),
            Some(Value::String("v2".to_owned()))
        );
    }
}
