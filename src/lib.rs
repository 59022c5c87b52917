// =============================================================================
// CATADT — Types algébriques extensibles et schémas de récursion en Rust
// =============================================================================
//
// Catadt est un moteur d'exécution pour des familles de variants étiquetés,
// sur lesquelles on déclare des opérations de récursion structurelle :
//
//   fold   (catamorphisme)   consommer une instance de bas en haut
//   unfold (anamorphisme)    générer une instance depuis une graine
//   map    (foncteur)        transformer les paramètres de type
//   merge  (fusion)          composer les trois sans intermédiaire
//
// Les familles sont OUVERTES : une famille enfant hérite des variants et
// des opérations de son parent, en ajoute, étend ou surcharge les handlers.
// Le dual coalgébrique (codata) décrit des structures infinies par leurs
// observateurs.
//
// Tous les parcours passent par une liste de travail explicite : une
// structure de profondeur 100 000 ne fait pas déborder la pile.
//
// =============================================================================

pub mod core;

pub use crate::core::codata::{CodataDecl, Interface, ObserverKind, Observable, Observers};
pub use crate::core::config::EngineConfig;
pub use crate::core::error::{AdtError, DeclarationError};
pub use crate::core::family::{
    ExtensionMode, ExtensionRecord, Family, FamilyDecl, FieldSpec, Variant, VariantDecl,
};
pub use crate::core::fields::{FieldInput, Fields};
pub use crate::core::fold::{FoldDecl, Handler};
pub use crate::core::instance::Instance;
pub use crate::core::map::MapDecl;
pub use crate::core::operation::{Operation, OperationKind, Signature};
pub use crate::core::typeside::{BaseType, Guard, Value};
pub use crate::core::unfold::{StandIn, UnfoldDecl};
