// =============================================================================
// MERGE — Fusion (déforestation) d'opérations déjà installées
// =============================================================================
//
//   factorial = merge(counter, product)
//
//   séquentiel : 5 → counter → Cons(5, Cons(4, ... Nil)) → product → 120
//   fusionné   : 5 → generator(counter) → ctor(product)   → 120
//                     (aucune instance de List n'est construite)
//
// Règles vérifiées à la déclaration :
//   - au plus un unfold (en tête) et au plus un fold (en queue)
//   - autant de maps que voulu entre les deux
//   - pas de fusion dans une fusion
//   - tous les opérandes déclarés par la MÊME famille
//
// L'appel suit la première étape : avec un unfold, la fusion s'appelle
// sur la famille avec une graine ; sinon sur une instance.
//
// =============================================================================

use super::error::{AdtError, DeclarationError};
use super::family::Family;
use super::operation::{self, Operation, OperationKind, Signature};
use super::transformer::Transformer;
use super::typeside::{BaseType, Guard};

fn illegal(name: &str, reason: impl Into<String>) -> AdtError {
    DeclarationError::IllegalMerge {
        operation: name.to_string(),
        reason: reason.into(),
    }
    .into()
}

impl Family {
    /// Installe la fusion des opérations `stages`, dans l'ordre d'application.
    pub fn install_merge(&self, name: &str, stages: &[&str]) -> Result<Family, AdtError> {
        operation::prepare_install(self, name, OperationKind::Merge)?;
        if stages.is_empty() {
            return Err(illegal(name, "aucun opérande"));
        }

        let mut ops = Vec::with_capacity(stages.len());
        for stage in stages {
            let op = self.operation(stage).ok_or_else(|| AdtError::UnknownOperation {
                family: self.name().to_string(),
                operation: stage.to_string(),
            })?;
            ops.push(op);
        }

        let count = |kind: OperationKind| ops.iter().filter(|op| op.kind() == kind).count();
        if count(OperationKind::Merge) > 0 {
            return Err(illegal(name, "une fusion ne peut pas contenir de fusion"));
        }
        if count(OperationKind::Fold) > 1 {
            return Err(illegal(name, "plus d'un fold"));
        }
        if count(OperationKind::Unfold) > 1 {
            return Err(illegal(name, "plus d'un unfold"));
        }
        for (i, op) in ops.iter().enumerate() {
            match op.kind() {
                OperationKind::Unfold if i != 0 => {
                    return Err(illegal(name, format!("l'unfold '{}' doit venir en premier", op.name())))
                }
                OperationKind::Fold if i != ops.len() - 1 => {
                    return Err(illegal(name, format!("le fold '{}' doit venir en dernier", op.name())))
                }
                _ => {}
            }
        }

        let origin = ops[0].declared_in();
        if let Some(stray) = ops.iter().find(|op| op.declared_in() != origin) {
            return Err(illegal(
                name,
                format!(
                    "'{}' est déclarée par {}, '{}' par {}",
                    ops[0].name(),
                    ops[0].family_name(),
                    stray.name(),
                    stray.family_name()
                ),
            ));
        }

        let transformers: Vec<&Transformer> = ops.iter().map(|op| op.transformer()).collect();
        let fused = Transformer::fuse(&transformers);

        let first = &ops[0];
        let last = &ops[ops.len() - 1];
        let input = match first.kind() {
            OperationKind::Unfold => first.signature().input.clone(),
            _ => Guard::Any,
        };
        let output = match last.kind() {
            OperationKind::Fold => last.signature().output.clone(),
            _ => Guard::Type(BaseType::Data),
        };
        let dispatch = (last.kind() == OperationKind::Fold).then(|| last.name().to_string());

        let op = Operation::new(name, OperationKind::Merge, Signature { input, output }, self, fused)
            .with_stages(stages.iter().map(|s| s.to_string()).collect(), dispatch);
        Ok(operation::register(self, op, None))
    }
}
