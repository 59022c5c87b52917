// =============================================================================
// CODATA — Le dual coalgébrique : des observateurs sur une graine
// =============================================================================
//
// Une donnée se CONSTRUIT puis se consomme (fold). Une codonnée ne se
// construit jamais en entier : on l'OBSERVE.
//
//   interface Stream { head: scalaire, tail: continuation }
//
//   countFrom(n) =
//     head ← n
//     tail ← n + 1          ← nouvelle graine, pas un nouveau flux complet
//
// Deux sortes d'observateurs :
//   - SCALAIRE      → une valeur, recalculée à chaque accès (pas de cache)
//   - CONTINUATION  → un nouvel observable de la même interface, créé au
//                     premier accès puis mémorisé par l'observable qui le
//                     reçoit : deux accès rendent le MÊME observable
//
// Le cache est une table (observateur → continuation) portée par chaque
// observable. Le moteur est mono-thread : un RefCell suffit.
//
// =============================================================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::error::{AdtError, DeclarationError};
use super::operation::Signature;
use super::typeside::Value;
use super::validate;

/// Sorte d'un observateur déclaré.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverKind {
    Scalar,
    Continuation,
}

impl fmt::Display for ObserverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObserverKind::Scalar => write!(f, "scalaire"),
            ObserverKind::Continuation => write!(f, "continuation"),
        }
    }
}

/// Déclaration d'une interface de codonnées (builder).
#[derive(Debug, Clone)]
pub struct CodataDecl {
    name: String,
    observers: IndexMap<String, ObserverKind>,
}

impl CodataDecl {
    pub fn new(name: &str) -> Self {
        CodataDecl {
            name: name.to_string(),
            observers: IndexMap::new(),
        }
    }

    pub fn scalar(&mut self, name: &str) -> &mut Self {
        self.observers.insert(name.to_string(), ObserverKind::Scalar);
        self
    }

    pub fn continuation(&mut self, name: &str) -> &mut Self {
        self.observers.insert(name.to_string(), ObserverKind::Continuation);
        self
    }

    pub fn define(&self) -> Interface {
        tracing::debug!(
            "interface {} définie : {} observateurs",
            self.name,
            self.observers.len()
        );
        Interface(Rc::new(InterfaceInner {
            name: self.name.clone(),
            observers: self.observers.clone(),
            unfolds: RefCell::new(IndexMap::new()),
        }))
    }
}

type ObserverFn = Rc<dyn Fn(&Value) -> Result<Value, AdtError>>;

#[derive(Clone)]
enum ObserverImpl {
    /// graine → valeur observée
    Scalar(ObserverFn),
    /// graine → graine suivante
    Continuation(ObserverFn),
}

impl ObserverImpl {
    fn kind(&self) -> ObserverKind {
        match self {
            ObserverImpl::Scalar(_) => ObserverKind::Scalar,
            ObserverImpl::Continuation(_) => ObserverKind::Continuation,
        }
    }
}

/// Implémentations des observateurs pour un unfold de codonnées.
#[derive(Clone, Default)]
pub struct Observers {
    impls: IndexMap<String, ObserverImpl>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalar(mut self, name: &str, f: impl Fn(&Value) -> Result<Value, AdtError> + 'static) -> Self {
        self.impls.insert(name.to_string(), ObserverImpl::Scalar(Rc::new(f)));
        self
    }

    /// `f` rend la graine de la continuation
    pub fn continuation(mut self, name: &str, f: impl Fn(&Value) -> Result<Value, AdtError> + 'static) -> Self {
        self.impls.insert(name.to_string(), ObserverImpl::Continuation(Rc::new(f)));
        self
    }
}

struct CodataUnfold {
    name: String,
    signature: Signature,
    observers: IndexMap<String, ObserverImpl>,
}

struct InterfaceInner {
    name: String,
    observers: IndexMap<String, ObserverKind>,
    unfolds: RefCell<IndexMap<String, Rc<CodataUnfold>>>,
}

/// Une interface de codonnées définie.
#[derive(Clone)]
pub struct Interface(Rc<InterfaceInner>);

impl Interface {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn observer_kind(&self, name: &str) -> Option<ObserverKind> {
        self.0.observers.get(name).copied()
    }

    pub fn observers(&self) -> Vec<(String, ObserverKind)> {
        self.0.observers.iter().map(|(n, k)| (n.clone(), *k)).collect()
    }

    pub fn unfolds(&self) -> Vec<String> {
        self.0.unfolds.borrow().keys().cloned().collect()
    }

    /// Installe un unfold de codonnées : une implémentation par observateur.
    pub fn unfold(&self, name: &str, signature: Signature, observers: Observers) -> Result<Interface, AdtError> {
        if self.0.unfolds.borrow().contains_key(name) {
            return Err(DeclarationError::DuplicateOperation {
                family: self.name().to_string(),
                operation: name.to_string(),
            }
            .into());
        }
        for (observer, imp) in &observers.impls {
            let declared = self.observer_kind(observer).ok_or_else(|| DeclarationError::UnknownObserver {
                interface: self.name().to_string(),
                observer: observer.clone(),
            })?;
            if declared != imp.kind() {
                return Err(DeclarationError::ObserverKindMismatch {
                    interface: self.name().to_string(),
                    observer: observer.clone(),
                    expected: declared.to_string(),
                }
                .into());
            }
        }
        if let Some(missing) = self.0.observers.keys().find(|o| !observers.impls.contains_key(*o)) {
            return Err(DeclarationError::MissingObserver {
                interface: self.name().to_string(),
                observer: missing.clone(),
            }
            .into());
        }

        tracing::debug!("{} : unfold de codonnées '{}' installé", self.name(), name);
        self.0.unfolds.borrow_mut().insert(
            name.to_string(),
            Rc::new(CodataUnfold {
                name: name.to_string(),
                signature,
                observers: observers.impls,
            }),
        );
        Ok(self.clone())
    }

    /// Crée l'observable racine à partir d'une graine. Rien n'est calculé
    /// avant le premier accès à un observateur.
    pub fn call(&self, name: &str, seed: impl Into<Value>) -> Result<Observable, AdtError> {
        let unfold = self
            .0
            .unfolds
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| AdtError::UnknownOperation {
                family: self.name().to_string(),
                operation: name.to_string(),
            })?;
        let seed = seed.into();
        if !unfold.signature.input.check(&seed) {
            return Err(AdtError::FieldType {
                variant: name.to_string(),
                field: "graine".to_string(),
                received: validate::summary(&seed),
                guard: unfold.signature.input.to_string(),
            });
        }
        let observable = Observable::new(self.clone(), Rc::clone(&unfold), seed);
        let produced = Value::Codata(observable.clone());
        if !unfold.signature.output.check(&produced) {
            return Err(AdtError::FieldType {
                variant: name.to_string(),
                field: "résultat".to_string(),
                received: validate::summary(&produced),
                guard: unfold.signature.output.to_string(),
            });
        }
        Ok(observable)
    }

    pub fn ptr_eq(&self, other: &Interface) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interface({})", self.name())
    }
}

struct ObservableInner {
    interface: Interface,
    unfold: Rc<CodataUnfold>,
    seed: Value,
    /// Continuations déjà matérialisées, par observateur
    memo: RefCell<HashMap<String, Observable>>,
}

/// Une instance de codonnées : une graine et ses observateurs.
#[derive(Clone)]
pub struct Observable(Rc<ObservableInner>);

impl Observable {
    fn new(interface: Interface, unfold: Rc<CodataUnfold>, seed: Value) -> Self {
        Observable(Rc::new(ObservableInner {
            interface,
            unfold,
            seed,
            memo: RefCell::new(HashMap::new()),
        }))
    }

    pub fn interface(&self) -> &Interface {
        &self.0.interface
    }

    /// Graine portée par cet observable
    pub fn seed(&self) -> &Value {
        &self.0.seed
    }

    fn implementation(&self, observer: &str) -> Result<&ObserverImpl, AdtError> {
        self.0.unfold.observers.get(observer).ok_or_else(|| {
            DeclarationError::UnknownObserver {
                interface: self.0.interface.name().to_string(),
                observer: observer.to_string(),
            }
            .into()
        })
    }

    /// Observe : un scalaire est recalculé, une continuation est mémorisée.
    pub fn observe(&self, observer: &str) -> Result<Value, AdtError> {
        match self.implementation(observer)? {
            ObserverImpl::Scalar(f) => f(&self.0.seed),
            ObserverImpl::Continuation(_) => self.next(observer).map(Value::Codata),
        }
    }

    /// Continuation `observer`, créée au premier accès puis mémorisée.
    pub fn next(&self, observer: &str) -> Result<Observable, AdtError> {
        let transition = match self.implementation(observer)? {
            ObserverImpl::Continuation(f) => Rc::clone(f),
            ObserverImpl::Scalar(_) => {
                return Err(DeclarationError::ObserverKindMismatch {
                    interface: self.0.interface.name().to_string(),
                    observer: observer.to_string(),
                    expected: ObserverKind::Scalar.to_string(),
                }
                .into())
            }
        };
        if let Some(cached) = self.0.memo.borrow().get(observer) {
            return Ok(cached.clone());
        }

        let seed = transition(&self.0.seed)?;
        let next = Observable::new(self.0.interface.clone(), Rc::clone(&self.0.unfold), seed);
        tracing::debug!(
            "{}.{} : continuation '{}' matérialisée",
            self.0.interface.name(),
            self.0.unfold.name,
            observer
        );
        self.0
            .memo
            .borrow_mut()
            .insert(observer.to_string(), next.clone());
        Ok(next)
    }

    /// Les `n` premières valeurs de `scalar`, en suivant `continuation`.
    pub fn take(&self, scalar: &str, continuation: &str, n: usize) -> Result<Vec<Value>, AdtError> {
        let mut out = Vec::with_capacity(n);
        let mut current = self.clone();
        for i in 0..n {
            out.push(current.observe(scalar)?);
            if i + 1 < n {
                current = current.next(continuation)?;
            }
        }
        Ok(out)
    }

    pub fn ptr_eq(&self, other: &Observable) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Identité : deux observables sont égaux s'ils sont le même observable.
impl PartialEq for Observable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Drop for ObservableInner {
    fn drop(&mut self) {
        let mut pending: Vec<Observable> = self.memo.get_mut().drain().map(|(_, o)| o).collect();
        while let Some(obs) = pending.pop() {
            if let Ok(mut inner) = Rc::try_unwrap(obs.0) {
                pending.extend(inner.memo.get_mut().drain().map(|(_, o)| o));
            }
        }
    }
}

impl fmt::Display for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}({})",
            self.0.interface.name(),
            self.0.unfold.name,
            validate::summary(&self.0.seed)
        )
    }
}

impl fmt::Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Observable({})", self)
    }
}
