use integration_tests::{Case, CaseError};
use ravel_core::Hypothesis;
use ravel_solvers::implicit::{Algorithm, ConfigError, Error as SetupError, Relaxation};

const BROYDEN: &str = r#"
[solver]
algorithm = "Broyden"
epsilon = 1e-12
max_iters = 50
broyden_seed = "numerical"

[solver.relaxation]
trigger = 10
coefficient = 0.8

[material]
young = 200e3
exponent = 3

[loading]
hypothesis = "PlaneStrain"
time_increment = 5
strain_increment = [1e-3, -1e-3, 0, 0]
"#;

#[test]
fn case_file_configures_solver_material_and_loading() {
    let case = Case::from_toml(BROYDEN).unwrap();
    assert_eq!(case.hypothesis().unwrap(), Hypothesis::PlaneStrain);
    assert_eq!(case.material.young, 200e3);
    assert_eq!(case.material.poisson, 0.3);

    let (integrator, step) = case.prepare().unwrap();
    let config = integrator.config();
    assert_eq!(config.algorithm(), Algorithm::Broyden);
    assert_eq!(config.max_iters(), 50);
    assert_eq!(
        config.relaxation(),
        Some(Relaxation {
            trigger: 10,
            coefficient: 0.8
        })
    );
    assert_eq!(config.sensitivities(), ["eel"]);

    assert_eq!(integrator.layout().len(), 5);
    assert_eq!(step.time_increment(), 5.0);
    assert_eq!(step.driving_increment().as_slice(), [1e-3, -1e-3, 0.0, 0.0]);
    assert!(!step.stiffness().is_requested());
}

#[test]
fn solver_section_is_optional() {
    let case = Case::from_toml(
        r#"
        [loading]
        time_increment = 1
        strain_increment = [0, 0, 0, 0, 0, 0]
        "#,
    )
    .unwrap();
    let (integrator, _) = case.prepare().unwrap();
    assert_eq!(integrator.config().algorithm(), Algorithm::NewtonRaphson);
    assert_eq!(case.hypothesis().unwrap(), Hypothesis::Tridimensional);
}

#[test]
fn unknown_keys_are_rejected() {
    let result = Case::from_toml(
        r#"
        [solver]
        algoritm = "Broyden"

        [loading]
        time_increment = 1
        strain_increment = [0, 0, 0, 0, 0, 0]
        "#,
    );
    assert!(matches!(result, Err(CaseError::Parse(_))));
}

#[test]
fn unknown_algorithms_are_rejected() {
    let result = Case::from_toml(
        r#"
        [solver]
        algorithm = "PowellDogLeg_NewtonRaphson"

        [loading]
        time_increment = 1
        strain_increment = [0, 0, 0, 0, 0, 0]
        "#,
    );
    assert!(matches!(result, Err(CaseError::Parse(_))));
}

#[test]
fn invalid_settings_surface_as_config_errors() {
    let case = Case::from_toml(
        r#"
        [solver]
        theta = 1.5

        [loading]
        time_increment = 1
        strain_increment = [0, 0, 0, 0, 0, 0]
        "#,
    )
    .unwrap();
    assert!(matches!(
        case.prepare(),
        Err(CaseError::Config(ConfigError::Theta))
    ));
}

#[test]
fn limits_on_undeclared_variables_fail_setup() {
    let case = Case::from_toml(
        r#"
        [solver.increment_limits.variables]
        T = 10.0

        [loading]
        time_increment = 1
        strain_increment = [0, 0, 0, 0, 0, 0]
        "#,
    )
    .unwrap();
    assert!(matches!(
        case.prepare(),
        Err(CaseError::Setup(SetupError::UnknownVariable { ref name, .. })) if name == "T"
    ));
}

#[test]
fn loading_must_match_the_hypothesis() {
    let case = Case::from_toml(
        r#"
        [loading]
        hypothesis = "Axisymmetrical"
        time_increment = 1
        strain_increment = [0, 0, 0]
        "#,
    )
    .unwrap();
    assert!(matches!(
        case.prepare(),
        Err(CaseError::StrainSize {
            expected: 4,
            found: 3,
            ..
        })
    ));

    let case = Case::from_toml(
        r#"
        [loading]
        hypothesis = "Spherical"
        time_increment = 1
        strain_increment = [0, 0, 0]
        "#,
    )
    .unwrap();
    assert!(matches!(case.hypothesis(), Err(CaseError::Hypothesis(_))));
}
