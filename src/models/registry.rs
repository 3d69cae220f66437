//! Static model catalog.
//!
//! Catalog entries are immutable for the lifetime of the process; callers get
//! working copies through [`ModelRegistry::instantiate`].

use std::sync::OnceLock;

use crate::domain::{Model, ModelFamily, Parameter};

const INF: f64 = f64::INFINITY;
const NEG_INF: f64 = f64::NEG_INFINITY;

/// The catalog of models, their parameter defaults, bounds and units.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<Model>,
}

impl ModelRegistry {
    /// The process-wide catalog (all families).
    pub fn global() -> &'static ModelRegistry {
        static REGISTRY: OnceLock<ModelRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| ModelRegistry {
            models: generic_models().into_iter().chain(sas_models()).collect(),
        })
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn family(&self, family: ModelFamily) -> impl Iterator<Item = &Model> {
        self.models.iter().filter(move |m| m.family == family)
    }

    pub fn get(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Clone a catalog entry so edits never touch the catalog.
    pub fn instantiate(&self, name: &str) -> Option<Model> {
        self.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }
}

fn generic_models() -> Vec<Model> {
    vec![
        Model {
            name: "linear".to_string(),
            display_name: "Linear".to_string(),
            family: ModelFamily::Generic,
            parameters: vec![
                Parameter::new("a", 1.0, true, NEG_INF, INF),
                Parameter::new("b", 0.0, true, NEG_INF, INF),
            ],
            info_text: "Function:\na*x + b".to_string(),
        },
        Model {
            name: "parabola".to_string(),
            display_name: "Parabola".to_string(),
            family: ModelFamily::Generic,
            parameters: vec![
                Parameter::new("a", 1.0, true, NEG_INF, INF),
                Parameter::new("b", 0.0, true, NEG_INF, INF),
                Parameter::new("c", 0.0, true, NEG_INF, INF),
            ],
            info_text: "Function:\na*x^2 + b*x + c".to_string(),
        },
        Model {
            name: "gaussian".to_string(),
            display_name: "Gaussian".to_string(),
            family: ModelFamily::Generic,
            parameters: vec![
                Parameter::new("A", 1.0, true, 0.0, INF),
                Parameter::new("μ", 0.5, true, NEG_INF, INF),
                Parameter::new("σ", 0.1, true, 0.0, INF),
                Parameter::new("c", 0.0, true, NEG_INF, INF),
            ],
            info_text: "Function:\nA*exp( - ½((x - μ)/σ)² ) + c".to_string(),
        },
    ]
}

fn sas_models() -> Vec<Model> {
    vec![
        Model {
            name: "sas_sphere".to_string(),
            display_name: "Sphere".to_string(),
            family: ModelFamily::Sas,
            parameters: vec![
                Parameter::new("I0", 1.0, true, 0.0, 10.0).with_unit("cm⁻¹", 1.0),
                Parameter::new("R", 50.0, true, 0.0, INF).with_unit("Å", 1.0),
                Parameter::new("σ_R", 10.0, true, 0.0, 30.0).with_unit("%", 1e-2),
                Parameter::new("SLD_sphere", 40.0, false, -100.0, 100.0).with_unit("10⁻⁶ Å⁻²", 1e-6),
                Parameter::new("SLD_matrix", 10.0, false, -100.0, 100.0).with_unit("10⁻⁶ Å⁻²", 1e-6),
                Parameter::new("Gauss-Hermite Degree", 20.0, false, 1.0, 100.0),
            ],
            info_text: "Function:\n P(q) = ΔSLD²·∫V²·F(q)² g(R, σ_R) dR\n\
                        F(q) = 3[sin(qR) - qRcos(qR)]/(qR)³\n\
                        g(μ, σ): Lognormal Distr."
                .to_string(),
        },
        Model {
            name: "sas_cube".to_string(),
            display_name: "Cube".to_string(),
            family: ModelFamily::Sas,
            parameters: vec![
                Parameter::new("I0", 1.0, true, 0.0, 10.0).with_unit("cm⁻¹", 1.0),
                Parameter::new("a", 50.0, true, 0.0, INF).with_unit("Å", 1.0),
                Parameter::new("σ_a", 10.0, true, 0.0, 30.0).with_unit("%", 1e-2),
                Parameter::new("SLD_cube", 40.0, false, -100.0, 100.0).with_unit("10⁻⁶ Å⁻²", 1e-6),
                Parameter::new("SLD_matrix", 10.0, false, -100.0, 100.0).with_unit("10⁻⁶ Å⁻²", 1e-6),
                Parameter::new("Gauss-Legendre Degree", 20.0, false, 1.0, 100.0),
                Parameter::new("Gauss-Hermite Degree", 20.0, false, 1.0, 100.0),
            ],
            info_text: "Function:\n P(q) = ΔSLD²·∫V²·F(q)²·g(a, σ_a) da\n\
                        F(q) = ∫∫ sinc(q_x·a/2)·sinc(q_y·a/2)·sinc(q_z·a/2)dΩ\n\
                        g(μ, σ): Lognormal Distr."
                .to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_defaults_are_consistent() {
        let registry = ModelRegistry::global();
        assert_eq!(registry.models().len(), 5);
        for model in registry.models() {
            assert!(!model.parameters.is_empty(), "{}", model.name);
            for p in &model.parameters {
                assert!(p.unit_value != 0.0 && p.unit_value.is_finite(), "{}.{}", model.name, p.name);
                assert!(p.min <= p.value && p.value <= p.max, "{}.{}", model.name, p.name);
                assert!(p.std_error.is_none());
            }
        }
    }

    #[test]
    fn instantiate_returns_an_independent_copy() {
        let registry = ModelRegistry::global();
        let mut working = registry.instantiate("gaussian").unwrap();
        working.parameters[0].value = 42.0;
        assert_eq!(registry.get("gaussian").unwrap().parameters[0].value, 1.0);
        assert!(registry.instantiate("nope").is_none());
    }

    #[test]
    fn families_partition_the_catalog() {
        let registry = ModelRegistry::global();
        let generic: Vec<_> = registry.family(ModelFamily::Generic).map(|m| m.name.as_str()).collect();
        let sas: Vec<_> = registry.family(ModelFamily::Sas).map(|m| m.name.as_str()).collect();
        assert_eq!(generic, ["linear", "parabola", "gaussian"]);
        assert_eq!(sas, ["sas_sphere", "sas_cube"]);
    }
}
