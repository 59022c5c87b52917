// =============================================================================
// OPERATION — Les capacités nommées d'une famille
// =============================================================================
//
// Une OPÉRATION est une capacité nommée attachée à une famille :
//   fold   (catamorphisme)  instance → valeur
//   unfold (anamorphisme)   graine → instance
//   map    (foncteur)       instance → instance de même forme
//   merge  (fusion)         composition des trois, sans intermédiaire
//
// Quelle que soit sa nature, une opération est compilée en un
// TRANSFORMATEUR (voir transformer.rs). L'installeur vérifie, au moment
// de la déclaration et jamais plus tard :
//   - pas de collision avec un champ d'un variant couvert, y compris
//     ceux des familles enfants déjà définies
//   - pas de redéclaration locale du même nom
//   - même nature que l'opération héritée qu'on étend
//
// =============================================================================

use std::fmt;
use std::rc::Rc;

use super::error::{AdtError, DeclarationError};
use super::family::{ExtensionMode, Family, FamilyId};
use super::transformer::Transformer;
use super::typeside::{BaseType, Guard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Fold,
    Unfold,
    Map,
    Merge,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Fold => "fold",
            OperationKind::Unfold => "unfold",
            OperationKind::Map => "map",
            OperationKind::Merge => "merge",
        };
        write!(f, "{}", name)
    }
}

/// Signature déclarée : garde d'entrée (graine) et garde de sortie.
#[derive(Debug, Clone)]
pub struct Signature {
    pub input: Guard,
    pub output: Guard,
}

impl Signature {
    pub fn new(input: impl Into<Guard>, output: impl Into<Guard>) -> Self {
        Signature {
            input: input.into(),
            output: output.into(),
        }
    }

    /// Signature d'une opération sans graine
    pub fn output(output: impl Into<Guard>) -> Self {
        Signature {
            input: Guard::Any,
            output: output.into(),
        }
    }

    pub fn any() -> Self {
        Signature {
            input: Guard::Any,
            output: Guard::Any,
        }
    }

    /// Instance → instance (map, unfold par défaut)
    pub(crate) fn data() -> Self {
        Signature {
            input: Guard::Any,
            output: Guard::Type(BaseType::Data),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.input, self.output)
    }
}

/// Une opération installée.
#[derive(Debug)]
pub struct Operation {
    name: String,
    kind: OperationKind,
    signature: Signature,
    declared_in: FamilyId,
    family_name: String,
    transformer: Transformer,
    /// Nom du fold consulté pour les nœuds hors de la table compilée
    dispatch: Option<String>,
    /// Opérandes d'une fusion, dans l'ordre
    stages: Vec<String>,
}

impl Operation {
    pub(crate) fn new(
        name: &str,
        kind: OperationKind,
        signature: Signature,
        family: &Family,
        transformer: Transformer,
    ) -> Self {
        Operation {
            name: name.to_string(),
            kind,
            signature,
            declared_in: family.id(),
            family_name: family.name().to_string(),
            transformer,
            dispatch: match kind {
                OperationKind::Fold => Some(name.to_string()),
                _ => None,
            },
            stages: Vec::new(),
        }
    }

    pub(crate) fn with_stages(mut self, stages: Vec<String>, dispatch: Option<String>) -> Self {
        self.stages = stages;
        self.dispatch = dispatch;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Famille qui a déclaré (ou redéclaré) l'opération
    pub fn declared_in(&self) -> FamilyId {
        self.declared_in
    }

    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    pub fn transformer(&self) -> &Transformer {
        &self.transformer
    }

    pub fn stages(&self) -> &[String] {
        &self.stages
    }

    pub(crate) fn dispatch_name(&self) -> Option<&str> {
        self.dispatch.as_deref()
    }

    /// L'opération s'appelle-t-elle sur la famille avec une graine ?
    pub fn takes_seed(&self) -> bool {
        self.transformer.generator().is_some()
    }
}

/// Vérifications communes à toute installation.
///
/// Rend l'opération héritée de même nom, s'il y en a une.
pub(crate) fn prepare_install(
    family: &Family,
    name: &str,
    kind: OperationKind,
) -> Result<Option<Rc<Operation>>, AdtError> {
    if family.own_operation(name).is_some() {
        return Err(DeclarationError::DuplicateOperation {
            family: family.name().to_string(),
            operation: name.to_string(),
        }
        .into());
    }
    check_name_collision(family, name)?;

    let inherited = family.parent().and_then(|p| p.operation(name));
    if let Some(op) = &inherited {
        if op.kind() != kind || kind == OperationKind::Merge {
            return Err(DeclarationError::KindMismatch {
                operation: name.to_string(),
                inherited: op.kind().to_string(),
                declared: kind.to_string(),
            }
            .into());
        }
    }
    Ok(inherited)
}

/// Le nom d'une opération ne doit masquer aucun champ visible, ni chez
/// la famille ni chez les enfants qui en hériteront.
pub(crate) fn check_name_collision(family: &Family, name: &str) -> Result<(), AdtError> {
    let inheritors = family.inheritors(name);
    let variants = family
        .variants()
        .into_iter()
        .chain(inheritors.iter().flat_map(|child| child.own_variants()));
    for variant in variants {
        if variant.has_field(name) {
            return Err(DeclarationError::NameCollision {
                operation: name.to_string(),
                variant: variant.name().to_string(),
                field: name.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

/// Enregistre l'opération dans la table locale de la famille.
pub(crate) fn register(family: &Family, op: Operation, mode: Option<ExtensionMode>) -> Family {
    tracing::debug!(
        "{} : opération '{}' ({}) installée, mode = {:?}",
        family.name(),
        op.name(),
        op.kind(),
        mode
    );
    family.insert_operation(op, mode);
    family.clone()
}
