// =============================================================================
// EVAL — Le pilote de parcours (liste de travail explicite)
// =============================================================================
//
// Toutes les opérations s'exécutent par UN SEUL pilote : un hylomorphisme
// sur une pile de travail allouée sur le tas, jamais par récursion native.
// Une structure de profondeur 100 000 ne fait donc pas déborder la pile.
//
//   Expand(graine)      → produire une couche (generator, ou projection
//                         d'une instance), appliquer param/atom, puis
//                         empiler Collapse et une Expand par champ récursif
//   Collapse(couche, n) → dépiler les n résultats des enfants, les remettre
//                         dans les champs récursifs, replier la couche
//
// Ordre : post-ordre, enfants de gauche à droite, AVANT le handler parent.
//
//   fold   = projection       + ctor
//   unfold = generator        + reconstruction (constructeur validant)
//   map    = projection+param + reconstruction
//   merge  = generator?+param + ctor?   (aucune instance intermédiaire)
//
// Dans une fusion, chaque couche générée passe ses gardes non récursives
// avant param/atom. L'invariant d'enregistrement n'y est vérifié que pour
// les variants sans champ récursif.
//
// =============================================================================

use std::rc::Rc;

use super::config::EngineConfig;
use super::error::{AdtError, DeclarationError};
use super::family::{Family, FieldSpec, Variant};
use super::fields::Fields;
use super::instance::Instance;
use super::operation::{Operation, OperationKind};
use super::transformer::{CtorTransform, Transformer};
use super::typeside::Value;
use super::validate;

/// Une couche : un variant et ses champs. Aux positions récursives, les
/// champs contiennent des graines (à l'aller) puis des résultats (au retour).
pub(crate) struct Layer {
    pub family: Family,
    pub variant: Rc<Variant>,
    pub fields: Fields,
}

impl Layer {
    fn project(inst: &Instance) -> Self {
        Layer {
            family: inst.family().clone(),
            variant: Rc::clone(inst.variant()),
            fields: inst.fields().clone(),
        }
    }
}

/// Résultat d'une expansion : une couche à parcourir, ou une feuille finie.
pub(crate) enum Step {
    Layer(Layer),
    Done(Value),
}

enum Frame {
    Expand(Value),
    Collapse(Layer, usize),
}

/// Hylomorphisme itératif : `expand` déplie, `collapse` replie.
pub(crate) fn hylo<E, C>(
    operation: &str,
    config: &EngineConfig,
    seed: Value,
    mut expand: E,
    mut collapse: C,
) -> Result<Value, AdtError>
where
    E: FnMut(Value) -> Result<Step, AdtError>,
    C: FnMut(Layer) -> Result<Value, AdtError>,
{
    let mut work = vec![Frame::Expand(seed)];
    let mut results: Vec<Value> = Vec::new();
    let mut steps = 0usize;

    tracing::trace!("parcours '{}' : début", operation);

    while let Some(frame) = work.pop() {
        steps += 1;
        match frame {
            Frame::Expand(seed) => match expand(seed)? {
                Step::Done(value) => results.push(value),
                Step::Layer(mut layer) => {
                    let variant = Rc::clone(&layer.variant);
                    let mut children = Vec::with_capacity(variant.recursive_fields().len());
                    for name in variant.recursive_fields() {
                        let child = layer.fields.replace(name, Value::Unit).ok_or_else(|| {
                            AdtError::FieldAccess {
                                field: name.clone(),
                                expected: "un champ récursif".to_string(),
                                found: "rien".to_string(),
                            }
                        })?;
                        children.push(child);
                    }
                    let n = children.len();
                    work.push(Frame::Collapse(layer, n));
                    work.extend(children.into_iter().rev().map(Frame::Expand));

                    if work.len() + results.len() > config.max_work_items {
                        tracing::warn!(
                            "parcours '{}' : borne de {} éléments atteinte après {} étapes",
                            operation,
                            config.max_work_items,
                            steps
                        );
                        return Err(AdtError::WorkLimit {
                            operation: operation.to_string(),
                            limit: config.max_work_items,
                        });
                    }
                }
            },
            Frame::Collapse(mut layer, n) => {
                let start = results
                    .len()
                    .checked_sub(n)
                    .ok_or_else(|| AdtError::handler("pile de résultats incohérente"))?;
                let variant = Rc::clone(&layer.variant);
                for (name, value) in variant.recursive_fields().iter().zip(results.drain(start..)) {
                    layer.fields.replace(name, value);
                }
                results.push(collapse(layer)?);
            }
        }
    }

    tracing::trace!("parcours '{}' : {} étapes", operation, steps);
    results
        .pop()
        .ok_or_else(|| AdtError::handler("parcours sans résultat"))
}

/// Exécute le transformateur d'une opération sur une graine ou une instance.
pub(crate) fn run(op: &Operation, family: &Family, input: Value, args: &[Value]) -> Result<Value, AdtError> {
    let t = op.transformer();
    let config = family.config();

    // Une couche générée qui ne sera pas reconstruite telle quelle passe
    // ici les gardes que la construction séquentielle aurait appliquées.
    let fused = t.ctor().is_some() || t.params().is_some() || t.atom().is_some();

    let expand = |seed: Value| -> Result<Step, AdtError> {
        let mut layer = match t.generator() {
            Some(generator) => {
                let layer = generator.generate(family, &seed)?;
                if fused {
                    if layer.variant.recursive_fields().is_empty() {
                        validate::check_fields(&layer.variant, &layer.fields)?;
                    } else {
                        validate::check_guards(&layer.variant, &layer.fields)?;
                    }
                }
                layer
            }
            None => match seed {
                Value::Data(inst) => Layer::project(&inst),
                leaf => return Ok(Step::Done(leaf)),
            },
        };
        apply_params(t, &mut layer, args)?;
        Ok(Step::Layer(layer))
    };

    let collapse = |layer: Layer| -> Result<Value, AdtError> {
        match t.ctor() {
            Some(ctor) => fold_layer(op, ctor, layer),
            None => layer
                .family
                .build(&layer.variant, layer.fields)
                .map(Value::Data),
        }
    };

    let result = hylo(op.name(), config, input, expand, collapse)?;

    if config.check_output && !op.signature().output.check(&result) {
        return Err(AdtError::FieldType {
            variant: op.name().to_string(),
            field: "résultat".to_string(),
            received: validate::summary(&result),
            guard: op.signature().output.to_string(),
        });
    }
    Ok(result)
}

/// Applique les facettes param et atom aux champs non récursifs.
fn apply_params(t: &Transformer, layer: &mut Layer, args: &[Value]) -> Result<(), AdtError> {
    if t.params().is_none() && t.atom().is_none() {
        return Ok(());
    }
    let variant = Rc::clone(&layer.variant);
    for (name, spec) in variant.fields() {
        let transform = match spec {
            FieldSpec::Param(p) => t.params().and_then(|pt| pt.get(p)),
            FieldSpec::Guard(_) => t.atom(),
            FieldSpec::SelfRef => None,
        };
        if let Some(f) = transform {
            if let Some(old) = layer.fields.replace(name, Value::Unit) {
                let new = f(&old, args)?;
                layer.fields.replace(name, new);
            }
        }
    }
    Ok(())
}

/// Replie une couche avec la table compilée ; un variant absent de la table
/// (famille sœur) est confié au fold de même nom de sa propre famille.
fn fold_layer(op: &Operation, ctor: &CtorTransform, layer: Layer) -> Result<Value, AdtError> {
    let tag = layer.variant.tag();
    if let Some(handler) = ctor.handler_for(tag) {
        return handler(&layer.fields);
    }
    if let Some(name) = op.dispatch_name() {
        if let Some(node_op) = layer.family.operation(name) {
            if let Some(handler) = node_op.transformer().ctor().and_then(|c| c.handler_for(tag)) {
                return handler(&layer.fields);
            }
        }
    }
    Err(DeclarationError::MissingHandler {
        operation: op.name().to_string(),
        variant: layer.variant.name().to_string(),
    }
    .into())
}

impl Instance {
    /// Appelle une opération (fold, map, ou fusion sans unfold) sur l'instance.
    pub fn call(&self, operation: &str, args: &[Value]) -> Result<Value, AdtError> {
        let op = self
            .family()
            .operation(operation)
            .ok_or_else(|| AdtError::UnknownOperation {
                family: self.family().name().to_string(),
                operation: operation.to_string(),
            })?;
        if op.takes_seed() {
            return Err(AdtError::WrongReceiver {
                operation: operation.to_string(),
                reason: "part d'une graine : l'appeler sur la famille".to_string(),
            });
        }
        if op.kind() != OperationKind::Map && !args.is_empty() {
            return Err(AdtError::Arity {
                variant: operation.to_string(),
                expected: 0,
                received: args.len(),
            });
        }
        run(&op, self.family(), Value::Data(self.clone()), args)
    }
}

impl Family {
    /// Appelle une opération à graine (unfold, ou fusion qui commence par un unfold).
    pub fn call(&self, operation: &str, seed: impl Into<Value>) -> Result<Value, AdtError> {
        let op = self
            .operation(operation)
            .ok_or_else(|| AdtError::UnknownOperation {
                family: self.name().to_string(),
                operation: operation.to_string(),
            })?;
        if !op.takes_seed() {
            return Err(AdtError::WrongReceiver {
                operation: operation.to_string(),
                reason: "s'applique à une instance : l'appeler sur l'instance".to_string(),
            });
        }
        let seed = seed.into();
        if self.config().check_output && !op.signature().input.check(&seed) {
            return Err(AdtError::FieldType {
                variant: operation.to_string(),
                field: "graine".to_string(),
                received: validate::summary(&seed),
                guard: op.signature().input.to_string(),
            });
        }
        run(&op, self, seed, &[])
    }
}
