// =============================================================================
// CONFIG — Réglages du moteur
// =============================================================================
//
// Une famille porte sa configuration ; une famille enfant hérite de celle
// de son parent sauf si elle en déclare une autre.
//
//   max_work_items → borne de la liste de travail explicite. Un unfold
//                    non productif échoue proprement (WorkLimit) au lieu
//                    d'épuiser la mémoire.
//   check_output   → vérifie les graines et les résultats contre la
//                    signature déclarée de l'opération.
//
// =============================================================================

/// Variable d'environnement lue par [`EngineConfig::from_env`]
pub const MAX_WORK_ITEMS_ENV: &str = "CATADT_MAX_WORK_ITEMS";

/// Borne par défaut de la liste de travail
pub const DEFAULT_MAX_WORK_ITEMS: usize = 10_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Nombre maximal d'éléments en attente sur la liste de travail
    pub max_work_items: usize,
    /// Vérifier graines et résultats contre la signature
    pub check_output: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_work_items: DEFAULT_MAX_WORK_ITEMS,
            check_output: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lit la borne de travail depuis l'environnement, sinon garde le défaut.
    /// Une valeur illisible est ignorée (avec un avertissement).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(MAX_WORK_ITEMS_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => config.max_work_items = limit,
                _ => tracing::warn!(
                    "{} = {:?} illisible, borne par défaut conservée",
                    MAX_WORK_ITEMS_ENV,
                    raw
                ),
            }
        }
        config
    }

    pub fn with_max_work_items(mut self, limit: usize) -> Self {
        self.max_work_items = limit;
        self
    }

    pub fn with_check_output(mut self, check: bool) -> Self {
        self.check_output = check;
        self
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let c = EngineConfig::default();
        assert_eq!(c.max_work_items, DEFAULT_MAX_WORK_ITEMS);
        assert!(c.check_output);
    }

    #[test]
    fn test_builders() {
        let c = EngineConfig::new()
            .with_max_work_items(64)
            .with_check_output(false);
        assert_eq!(c.max_work_items, 64);
        assert!(!c.check_output);
    }

    #[test]
    fn test_from_env() {
        std::env::set_var(MAX_WORK_ITEMS_ENV, "123");
        assert_eq!(EngineConfig::from_env().max_work_items, 123);
        std::env::set_var(MAX_WORK_ITEMS_ENV, "beaucoup");
        assert_eq!(EngineConfig::from_env().max_work_items, DEFAULT_MAX_WORK_ITEMS);
        std::env::remove_var(MAX_WORK_ITEMS_ENV);
    }
}
