// =============================================================================
// ERROR — La taxonomie des erreurs du moteur
// =============================================================================
//
// Trois moments où une erreur peut survenir :
//   1. DÉCLARATION : installer une opération ou définir une famille
//      (collision de noms, handler manquant, fusion illégale...)
//      → toujours détectées tout de suite, jamais différées à l'appel.
//   2. CONSTRUCTION : une garde rejette un champ, ou l'invariant de
//      l'enregistrement complet est violé.
//      → toujours récupérables : l'appelant corrige et réessaie.
//   3. APPEL : aucun cas d'unfold ne correspond, mutation tentée,
//      opération inconnue, borne de la liste de travail atteinte...
//
// Chaque erreur porte assez de contexte (variant, champ, prédicat)
// pour un diagnostic lisible.
//
// =============================================================================

/// Erreur de déclaration : détectée à l'installation d'une opération
/// ou à la définition d'une famille.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeclarationError {
    /// Deux variants locaux portent le même nom
    #[error("variant '{variant}' déclaré deux fois dans {family}")]
    DuplicateVariant { family: String, variant: String },

    /// Deux champs d'un même variant portent le même nom
    #[error("champ '{field}' déclaré deux fois dans le variant {variant}")]
    DuplicateField { variant: String, field: String },

    /// Un variant hérité ne peut pas être redéclaré
    #[error("variant '{variant}' déjà hérité de {parent}, impossible de le redéclarer dans {family}")]
    InheritedVariant {
        family: String,
        parent: String,
        variant: String,
    },

    /// Le nom d'une opération entre en collision avec un champ
    #[error("opération '{operation}' en collision avec le champ '{field}' du variant {variant}")]
    NameCollision {
        operation: String,
        variant: String,
        field: String,
    },

    /// Un variant n'a pas de handler et aucun joker n'est présent
    #[error("opération '{operation}' : aucun handler pour le variant {variant} (et pas de joker)")]
    MissingHandler { operation: String, variant: String },

    /// Le nom ne correspond à aucun variant de la famille
    #[error("{family} n'a pas de variant '{variant}'")]
    UnknownVariant { family: String, variant: String },

    /// Paramètre de type inconnu
    #[error("{family} n'a pas de paramètre de type '{param}'")]
    UnknownTypeParam { family: String, param: String },

    /// Handler déclaré avec accès au parent sans handler parent
    #[error("opération '{operation}' : rien à surcharger pour {variant} (aucun handler parent)")]
    NothingToOverride { operation: String, variant: String },

    /// Opération déjà déclarée localement sous ce nom
    #[error("opération '{operation}' déjà installée sur {family}")]
    DuplicateOperation { family: String, operation: String },

    /// Opération héritée d'une autre nature
    #[error("opération '{operation}' héritée comme {inherited}, impossible de l'étendre comme {declared}")]
    KindMismatch {
        operation: String,
        inherited: String,
        declared: String,
    },

    /// Composition de fusion invalide
    #[error("fusion '{operation}' invalide : {reason}")]
    IllegalMerge { operation: String, reason: String },

    /// Implémentation fournie pour un observateur inexistant
    #[error("interface {interface} : pas d'observateur '{observer}'")]
    UnknownObserver { interface: String, observer: String },

    /// Observateur sans implémentation
    #[error("interface {interface} : l'observateur '{observer}' n'a pas d'implémentation")]
    MissingObserver { interface: String, observer: String },

    /// Implémentation scalaire pour une continuation (ou l'inverse)
    #[error("interface {interface} : l'observateur '{observer}' est déclaré {expected}")]
    ObserverKindMismatch {
        interface: String,
        observer: String,
        expected: String,
    },
}

/// Erreur du moteur d'ADT.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdtError {
    /// Une garde rejette la valeur d'un champ
    #[error("{variant}.{field} : valeur {received} rejetée par la garde {guard}")]
    FieldType {
        variant: String,
        field: String,
        received: String,
        guard: String,
    },

    /// L'invariant de l'enregistrement complet est violé
    #[error("{variant} : invariant violé ({predicate}) pour {snapshot}")]
    InvariantViolation {
        variant: String,
        predicate: String,
        snapshot: String,
    },

    #[error(transparent)]
    Declaration(#[from] DeclarationError),

    /// Aucun cas d'unfold ne correspond à la graine
    #[error("unfold '{operation}' : aucun cas ne correspond à la graine {seed}")]
    Exhaustiveness { operation: String, seed: String },

    /// Tentative de mutation après construction
    #[error("{variant}.{field} : une instance est immuable après construction")]
    Immutable { variant: String, field: String },

    /// Champ inconnu fourni au constructeur
    #[error("{variant} n'a pas de champ '{field}'")]
    UnknownField { variant: String, field: String },

    /// Mauvais nombre d'arguments positionnels
    #[error("{variant} attend {expected} champs, {received} reçus")]
    Arity {
        variant: String,
        expected: usize,
        received: usize,
    },

    /// Variant inconnu à la construction
    #[error("{family} n'a pas de variant '{variant}'")]
    UnknownVariant { family: String, variant: String },

    /// Aucune opération de ce nom dans la lignée
    #[error("{family} n'a pas d'opération '{operation}'")]
    UnknownOperation { family: String, operation: String },

    /// Opération appelée sur le mauvais receveur (famille vs instance)
    #[error("opération '{operation}' : {reason}")]
    WrongReceiver { operation: String, reason: String },

    /// Accès typé incorrect à un champ depuis un handler
    #[error("champ '{field}' : attendu {expected}, trouvé {found}")]
    FieldAccess {
        field: String,
        expected: String,
        found: String,
    },

    /// Borne de la liste de travail atteinte
    #[error("liste de travail saturée ({limit} éléments) pendant '{operation}'")]
    WorkLimit { operation: String, limit: usize },

    /// Échec signalé par un handler utilisateur
    #[error("handler : {0}")]
    Handler(String),
}

impl AdtError {
    /// Raccourci pour les échecs signalés par le code utilisateur
    pub fn handler(message: impl Into<String>) -> Self {
        AdtError::Handler(message.into())
    }

    /// L'erreur est-elle une erreur de déclaration ?
    pub fn is_declaration(&self) -> bool {
        matches!(self, AdtError::Declaration(_))
    }
}
