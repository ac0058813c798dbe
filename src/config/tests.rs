use super::*;
use serial_test::serial;
use std::env;

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

fn clear_spanqa_env() {
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    unsafe {
        env::remove_var("SPANQA_OBJECTIVE");
        env::remove_var("SPANQA_SPAN_SELECTION_POLICY");
        env::remove_var("SPANQA_SPAN_HIDDEN_DIM");
        env::remove_var("SPANQA_PRUNING_RATIO");
    }
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.objective, Objective::Binary);
    assert_eq!(config.span_selection_policy, SelectionPolicy::Weighted);
    assert_eq!(config.span_hidden_dim, 100);
    assert!(config.pruning_ratio.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_objective_from_str() {
    assert_eq!("binary".parse::<Objective>().unwrap(), Objective::Binary);
    assert_eq!(
        " multinomial ".parse::<Objective>().unwrap(),
        Objective::Multinomial
    );
    assert_eq!(
        "softmax".parse::<Objective>().unwrap_err(),
        ConfigError::InvalidObjective {
            value: "softmax".to_string()
        }
    );
}

#[test]
fn test_policy_from_str() {
    assert_eq!(
        "union".parse::<SelectionPolicy>().unwrap(),
        SelectionPolicy::Union
    );
    assert_eq!(
        "majority".parse::<SelectionPolicy>().unwrap(),
        SelectionPolicy::Majority
    );
    assert_eq!(
        "weighted".parse::<SelectionPolicy>().unwrap(),
        SelectionPolicy::Weighted
    );
    assert!(matches!(
        "any".parse::<SelectionPolicy>(),
        Err(ConfigError::InvalidPolicy { .. })
    ));
}

#[test]
fn test_display_round_trips_names() {
    for objective in [Objective::Binary, Objective::Multinomial] {
        assert_eq!(objective.to_string().parse::<Objective>().unwrap(), objective);
    }
    for policy in [
        SelectionPolicy::Union,
        SelectionPolicy::Majority,
        SelectionPolicy::Weighted,
    ] {
        assert_eq!(policy.to_string().parse::<SelectionPolicy>().unwrap(), policy);
    }
}

#[test]
fn test_validate_rejects_multinomial_weighted() {
    let config = Config::new(Objective::Multinomial, SelectionPolicy::Weighted);
    let err = config.validate().unwrap_err();

    assert_eq!(
        err,
        ConfigError::IncompatiblePolicy {
            objective: "multinomial",
            policy: "weighted"
        }
    );
    assert!(err.to_string().contains("weighted"));
}

#[test]
fn test_validate_accepts_other_combinations() {
    for (objective, policy) in [
        (Objective::Binary, SelectionPolicy::Union),
        (Objective::Binary, SelectionPolicy::Majority),
        (Objective::Binary, SelectionPolicy::Weighted),
        (Objective::Multinomial, SelectionPolicy::Union),
        (Objective::Multinomial, SelectionPolicy::Majority),
    ] {
        assert!(
            Config::new(objective, policy).validate().is_ok(),
            "{objective}+{policy} should be valid"
        );
    }
}

#[test]
fn test_validate_zero_hidden_dim() {
    let config = Config::default().with_span_hidden_dim(0);
    assert_eq!(config.validate().unwrap_err(), ConfigError::ZeroHiddenDim);
}

#[test]
fn test_validate_pruning_ratio() {
    assert!(Config::default().with_pruning_ratio(2.0).validate().is_ok());
    assert!(matches!(
        Config::default().with_pruning_ratio(0.0).validate(),
        Err(ConfigError::InvalidPruningRatio { .. })
    ));
    assert!(matches!(
        Config::default().with_pruning_ratio(f32::NAN).validate(),
        Err(ConfigError::InvalidPruningRatio { .. })
    ));
}

#[test]
fn test_policy_is_discrete() {
    assert!(SelectionPolicy::Union.is_discrete());
    assert!(SelectionPolicy::Majority.is_discrete());
    assert!(!SelectionPolicy::Weighted.is_discrete());
}

#[test]
#[serial]
fn test_from_env_with_defaults() {
    clear_spanqa_env();

    let config = Config::from_env().expect("should parse with defaults");
    assert_eq!(config, Config::default());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_spanqa_env();

    with_env_vars(
        &[
            ("SPANQA_OBJECTIVE", "multinomial"),
            ("SPANQA_SPAN_SELECTION_POLICY", "majority"),
            ("SPANQA_SPAN_HIDDEN_DIM", "64"),
            ("SPANQA_PRUNING_RATIO", "2.0"),
        ],
        || {
            let config = Config::from_env().expect("should parse");
            assert_eq!(config.objective, Objective::Multinomial);
            assert_eq!(config.span_selection_policy, SelectionPolicy::Majority);
            assert_eq!(config.span_hidden_dim, 64);
            assert_eq!(config.pruning_ratio, Some(2.0));
            assert!(config.validate().is_ok());
        },
    );
}

#[test]
#[serial]
fn test_from_env_invalid_objective() {
    clear_spanqa_env();

    with_env_vars(&[("SPANQA_OBJECTIVE", "ranking")], || {
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidObjective { .. })
        ));
    });
}

#[test]
#[serial]
fn test_from_env_incompatible_is_caught_by_validate() {
    clear_spanqa_env();

    with_env_vars(&[("SPANQA_OBJECTIVE", "multinomial")], || {
        let config = Config::from_env().expect("names parse");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IncompatiblePolicy { .. })
        ));
    });
}

#[test]
#[serial]
fn test_from_env_bad_hidden_dim() {
    clear_spanqa_env();

    with_env_vars(&[("SPANQA_SPAN_HIDDEN_DIM", "wide")], || {
        assert_eq!(
            Config::from_env().unwrap_err(),
            ConfigError::ParseError {
                name: "SPANQA_SPAN_HIDDEN_DIM",
                value: "wide".to_string()
            }
        );
    });
}

#[test]
#[serial]
fn test_from_env_blank_values_use_defaults() {
    clear_spanqa_env();

    with_env_vars(
        &[("SPANQA_OBJECTIVE", "  "), ("SPANQA_PRUNING_RATIO", "")],
        || {
            let config = Config::from_env().expect("should parse");
            assert_eq!(config.objective, Objective::Binary);
            assert!(config.pruning_ratio.is_none());
        },
    );
}
