// =============================================================================
// FAMILY — Le registre des variants et le modèle d'extension
// =============================================================================
//
// Une FAMILLE est un type algébrique nommé : un ensemble de VARIANTS
// étiquetés, des paramètres de type, et un registre d'OPÉRATIONS.
//
//   Peano = Zero | Succ(pred: Self)
//   List<T> = Nil | Cons(head: T, tail: Self)
//
// Chaque variant est soit un SINGLETON (aucun champ), soit STRUCTURÉ
// (des champs ordonnés). Un champ est décrit par :
//   - une garde de type (Int, Str, prédicat...)
//   - Self : un champ récursif, instance de la famille
//   - un paramètre de type (T) : tout est accepté
//
// EXTENSION : une famille peut déclarer un parent. Elle hérite alors
// de tous ses variants (mêmes étiquettes, mêmes définitions partagées)
// et de toutes ses opérations, puis peut en ajouter :
//
//   ExtendedPeano extends Peano = ...Peano | Pred(succ: Self)
//
// La résolution d'une opération remonte la chaîne des parents : la
// déclaration la plus proche gagne.
//
// =============================================================================

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::config::EngineConfig;
use super::error::{AdtError, DeclarationError};
use super::fields::{FieldInput, Fields};
use super::instance::Instance;
use super::operation::Operation;
use super::typeside::{BaseType, Guard};
use super::validate;

/// Identité d'une famille
pub type FamilyId = u64;

/// Étiquette d'exécution d'un variant, unique dans tout le processus
pub type VariantTag = u64;

static NEXT_FAMILY_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_VARIANT_TAG: AtomicU64 = AtomicU64::new(1);

/// Spécification d'un champ.
#[derive(Debug, Clone)]
pub enum FieldSpec {
    /// Garde de type
    Guard(Guard),
    /// Champ récursif : une instance de la famille qui déclare le variant
    SelfRef,
    /// Paramètre de type : aucune garde, mais visible par `map`
    Param(String),
}

impl FieldSpec {
    pub fn ty(ty: BaseType) -> Self {
        FieldSpec::Guard(Guard::Type(ty))
    }

    pub fn any() -> Self {
        FieldSpec::Guard(Guard::Any)
    }

    /// Champ typé par une autre famille (non récursif)
    pub fn of(family: &Family) -> Self {
        FieldSpec::Guard(Guard::Family(family.clone()))
    }

    pub fn param(name: &str) -> Self {
        FieldSpec::Param(name.to_string())
    }

    pub fn is_recursive(&self) -> bool {
        matches!(self, FieldSpec::SelfRef)
    }
}

impl From<Guard> for FieldSpec {
    fn from(guard: Guard) -> Self {
        FieldSpec::Guard(guard)
    }
}

impl From<BaseType> for FieldSpec {
    fn from(ty: BaseType) -> Self {
        FieldSpec::ty(ty)
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSpec::Guard(g) => write!(f, "{}", g),
            FieldSpec::SelfRef => write!(f, "Self"),
            FieldSpec::Param(p) => write!(f, "{}", p),
        }
    }
}

/// Invariant d'enregistrement : évalué une fois que toutes les gardes passent.
#[derive(Clone)]
pub struct Invariant {
    description: String,
    test: Rc<dyn Fn(&Fields) -> bool>,
}

impl Invariant {
    pub fn new(description: &str, test: impl Fn(&Fields) -> bool + 'static) -> Self {
        Invariant {
            description: description.to_string(),
            test: Rc::new(test),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn holds(&self, fields: &Fields) -> bool {
        (self.test)(fields)
    }
}

impl fmt::Debug for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invariant({})", self.description)
    }
}

/// Déclaration d'un variant structuré, avant définition de la famille.
#[derive(Debug, Clone, Default)]
pub struct VariantDecl {
    fields: Vec<(String, FieldSpec)>,
    invariant: Option<Invariant>,
}

impl VariantDecl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute un champ (l'ordre d'appel est l'ordre positionnel)
    pub fn field(mut self, name: &str, spec: impl Into<FieldSpec>) -> Self {
        self.fields.push((name.to_string(), spec.into()));
        self
    }

    /// Pose l'invariant de l'enregistrement complet
    pub fn invariant(mut self, description: &str, test: impl Fn(&Fields) -> bool + 'static) -> Self {
        self.invariant = Some(Invariant::new(description, test));
        self
    }
}

/// Un variant défini : forme partagée par toutes ses instances.
#[derive(Debug)]
pub struct Variant {
    tag: VariantTag,
    name: String,
    declared_in: FamilyId,
    family_name: String,
    fields: Vec<(String, FieldSpec)>,
    recursive: Vec<String>,
    invariant: Option<Invariant>,
}

impl Variant {
    pub fn tag(&self) -> VariantTag {
        self.tag
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Famille qui a déclaré ce variant (pas forcément celle qui l'utilise)
    pub fn declared_in(&self) -> FamilyId {
        self.declared_in
    }

    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    pub fn is_singleton(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[(String, FieldSpec)] {
        &self.fields
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field_spec(name).is_some()
    }

    /// Champs récursifs, dans l'ordre déclaré
    pub fn recursive_fields(&self) -> &[String] {
        &self.recursive
    }

    pub fn invariant(&self) -> Option<&Invariant> {
        self.invariant.as_ref()
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.fields.is_empty() {
            let parts: Vec<String> = self
                .fields
                .iter()
                .map(|(n, s)| format!("{}: {}", n, s))
                .collect();
            write!(f, "({})", parts.join(", "))?;
        }
        Ok(())
    }
}

/// Mode d'une opération redéclarée par un enfant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionMode {
    /// Nouveaux variants seulement : les handlers hérités sont réutilisés
    Extend,
    /// Des handlers hérités sont redéfinis
    Override { variants: Vec<String> },
}

/// Lien enfant → parent, et mode de chaque opération redéclarée.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRecord {
    pub parent: String,
    pub parent_id: FamilyId,
    pub operations: IndexMap<String, ExtensionMode>,
}

/// Déclaration d'une famille (builder).
#[derive(Debug, Clone)]
pub struct FamilyDecl {
    name: String,
    parent: Option<Family>,
    type_params: Vec<String>,
    variants: Vec<(String, VariantDecl)>,
    config: Option<EngineConfig>,
}

impl FamilyDecl {
    pub fn new(name: &str) -> Self {
        FamilyDecl {
            name: name.to_string(),
            parent: None,
            type_params: Vec::new(),
            variants: Vec::new(),
            config: None,
        }
    }

    /// Déclare une famille enfant de `parent`
    pub fn extending(name: &str, parent: &Family) -> Self {
        let mut decl = Self::new(name);
        decl.parent = Some(parent.clone());
        decl
    }

    pub fn type_param(&mut self, name: &str) -> &mut Self {
        if !self.type_params.iter().any(|p| p == name) {
            self.type_params.push(name.to_string());
        }
        self
    }

    pub fn singleton(&mut self, name: &str) -> &mut Self {
        self.variants.push((name.to_string(), VariantDecl::new()));
        self
    }

    pub fn variant(&mut self, name: &str, decl: VariantDecl) -> &mut Self {
        self.variants.push((name.to_string(), decl));
        self
    }

    pub fn config(&mut self, config: EngineConfig) -> &mut Self {
        self.config = Some(config);
        self
    }

    /// Définit la famille : attribue les étiquettes et fusionne l'héritage.
    pub fn define(&self) -> Result<Family, AdtError> {
        let id = NEXT_FAMILY_ID.fetch_add(1, Ordering::Relaxed);

        // Héritage : variants et paramètres du parent d'abord
        let mut variants: IndexMap<String, Rc<Variant>> = IndexMap::new();
        let mut type_params: Vec<String> = Vec::new();
        if let Some(parent) = &self.parent {
            for v in parent.variants() {
                variants.insert(v.name().to_string(), v);
            }
            type_params.extend(parent.type_params().iter().cloned());
        }
        for p in &self.type_params {
            if !type_params.contains(p) {
                type_params.push(p.clone());
            }
        }

        let mut local: Vec<&str> = Vec::new();
        for (vname, decl) in &self.variants {
            if local.contains(&vname.as_str()) {
                return Err(DeclarationError::DuplicateVariant {
                    family: self.name.clone(),
                    variant: vname.clone(),
                }
                .into());
            }
            if let (Some(parent), true) = (&self.parent, variants.contains_key(vname)) {
                return Err(DeclarationError::InheritedVariant {
                    family: self.name.clone(),
                    parent: parent.name().to_string(),
                    variant: vname.clone(),
                }
                .into());
            }
            local.push(vname);

            let mut field_names: Vec<&str> = Vec::new();
            for (fname, spec) in &decl.fields {
                if field_names.contains(&fname.as_str()) {
                    return Err(DeclarationError::DuplicateField {
                        variant: vname.clone(),
                        field: fname.clone(),
                    }
                    .into());
                }
                field_names.push(fname);
                if let FieldSpec::Param(p) = spec {
                    if !type_params.contains(p) {
                        return Err(DeclarationError::UnknownTypeParam {
                            family: self.name.clone(),
                            param: p.clone(),
                        }
                        .into());
                    }
                }
                // Un nouveau champ ne doit pas masquer une opération héritée
                if let Some(parent) = &self.parent {
                    if parent.operation(fname).is_some() {
                        return Err(DeclarationError::NameCollision {
                            operation: fname.clone(),
                            variant: vname.clone(),
                            field: fname.clone(),
                        }
                        .into());
                    }
                }
            }

            let recursive = decl
                .fields
                .iter()
                .filter(|(_, s)| s.is_recursive())
                .map(|(n, _)| n.clone())
                .collect();
            let variant = Variant {
                tag: NEXT_VARIANT_TAG.fetch_add(1, Ordering::Relaxed),
                name: vname.clone(),
                declared_in: id,
                family_name: self.name.clone(),
                fields: decl.fields.clone(),
                recursive,
                invariant: decl.invariant.clone(),
            };
            variants.insert(vname.clone(), Rc::new(variant));
        }

        let extension = self.parent.as_ref().map(|p| ExtensionRecord {
            parent: p.name().to_string(),
            parent_id: p.id(),
            operations: IndexMap::new(),
        });
        let config = self
            .config
            .clone()
            .or_else(|| self.parent.as_ref().map(|p| p.config().clone()))
            .unwrap_or_default();

        tracing::debug!(
            "famille {} définie : {} variants ({} locaux), parent = {:?}",
            self.name,
            variants.len(),
            local.len(),
            self.parent.as_ref().map(|p| p.name().to_string())
        );

        let inner = Rc::new(FamilyInner {
            id,
            name: self.name.clone(),
            parent: self.parent.clone(),
            type_params,
            variants,
            operations: RefCell::new(IndexMap::new()),
            extension: RefCell::new(extension),
            config,
            children: RefCell::new(Vec::new()),
        });
        if let Some(parent) = &self.parent {
            let mut children = parent.0.children.borrow_mut();
            children.retain(|child| child.strong_count() > 0);
            children.push(Rc::downgrade(&inner));
        }
        Ok(Family(inner))
    }
}

pub(crate) struct FamilyInner {
    id: FamilyId,
    name: String,
    parent: Option<Family>,
    type_params: Vec<String>,
    variants: IndexMap<String, Rc<Variant>>,
    /// Opérations déclarées localement ; muté seulement à la déclaration
    operations: RefCell<IndexMap<String, Rc<Operation>>>,
    extension: RefCell<Option<ExtensionRecord>>,
    config: EngineConfig,
    /// Familles enfants encore vivantes
    children: RefCell<Vec<Weak<FamilyInner>>>,
}

/// Une famille définie. Cloner une `Family` partage la même définition.
#[derive(Clone)]
pub struct Family(Rc<FamilyInner>);

impl Family {
    pub fn id(&self) -> FamilyId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn parent(&self) -> Option<&Family> {
        self.0.parent.as_ref()
    }

    /// Les ancêtres, du parent direct à la racine
    pub fn ancestors(&self) -> Vec<Family> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(f) = current {
            out.push(f.clone());
            current = f.parent();
        }
        out
    }

    /// La famille `id` est-elle cette famille ou un de ses ancêtres ?
    pub fn descends_from(&self, id: FamilyId) -> bool {
        let mut current = Some(self);
        while let Some(f) = current {
            if f.id() == id {
                return true;
            }
            current = f.parent();
        }
        false
    }

    /// Descendants vivants qui résolvent `operation` jusqu'ici : la
    /// descente s'arrête sous un enfant qui la redéclare.
    pub(crate) fn inheritors(&self, operation: &str) -> Vec<Family> {
        let mut out = Vec::new();
        let mut pending = vec![self.clone()];
        while let Some(family) = pending.pop() {
            for child in family.0.children.borrow().iter().filter_map(Weak::upgrade) {
                let child = Family(child);
                if child.own_operation(operation).is_none() {
                    pending.push(child.clone());
                    out.push(child);
                }
            }
        }
        out
    }

    pub fn type_params(&self) -> &[String] {
        &self.0.type_params
    }

    pub fn has_type_param(&self, name: &str) -> bool {
        self.0.type_params.iter().any(|p| p == name)
    }

    /// Tous les variants visibles (hérités puis locaux)
    pub fn variants(&self) -> Vec<Rc<Variant>> {
        self.0.variants.values().cloned().collect()
    }

    /// Variants déclarés par cette famille elle-même
    pub fn own_variants(&self) -> Vec<Rc<Variant>> {
        self.0
            .variants
            .values()
            .filter(|v| v.declared_in() == self.id())
            .cloned()
            .collect()
    }

    pub fn variant(&self, name: &str) -> Option<Rc<Variant>> {
        self.0.variants.get(name).cloned()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.0.config
    }

    pub fn extension(&self) -> Option<ExtensionRecord> {
        self.0.extension.borrow().clone()
    }

    /// Résout une opération : déclaration locale, sinon chez les ancêtres
    pub fn operation(&self, name: &str) -> Option<Rc<Operation>> {
        let mut current = Some(self);
        while let Some(f) = current {
            if let Some(op) = f.0.operations.borrow().get(name) {
                return Some(Rc::clone(op));
            }
            current = f.parent();
        }
        None
    }

    pub fn own_operation(&self, name: &str) -> Option<Rc<Operation>> {
        self.0.operations.borrow().get(name).cloned()
    }

    /// Noms de toutes les opérations visibles
    pub fn operations(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut chain = vec![self.clone()];
        chain.extend(self.ancestors());
        for f in chain.iter().rev() {
            for name in f.0.operations.borrow().keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    pub(crate) fn insert_operation(&self, op: Operation, mode: Option<ExtensionMode>) {
        let name = op.name().to_string();
        self.0.operations.borrow_mut().insert(name.clone(), Rc::new(op));
        if let (Some(mode), Some(record)) = (mode, self.0.extension.borrow_mut().as_mut()) {
            record.operations.insert(name, mode);
        }
    }

    /// Construit une instance à partir de champs nommés ou positionnels.
    pub fn construct(&self, variant: &str, input: impl Into<FieldInput>) -> Result<Instance, AdtError> {
        let v = self.variant(variant).ok_or_else(|| AdtError::UnknownVariant {
            family: self.name().to_string(),
            variant: variant.to_string(),
        })?;
        let fields = validate::order_input(&v, input.into())?;
        self.build(&v, fields)
    }

    /// Construit un singleton
    pub fn singleton(&self, variant: &str) -> Result<Instance, AdtError> {
        self.construct(variant, FieldInput::empty())
    }

    /// Chemin de construction commun : gardes, invariant, gel.
    pub(crate) fn build(&self, variant: &Rc<Variant>, fields: Fields) -> Result<Instance, AdtError> {
        validate::check_fields(variant, &fields)?;
        Ok(Instance::freeze(self.clone(), Rc::clone(variant), fields))
    }

    pub fn ptr_eq(&self, other: &Family) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Family({}#{})", self.name(), self.id())
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "family {}", self.name())?;
        if !self.type_params().is_empty() {
            write!(f, "<{}>", self.type_params().join(", "))?;
        }
        if let Some(parent) = self.parent() {
            write!(f, " extends {}", parent.name())?;
        }
        writeln!(f, " {{")?;
        writeln!(f, "  variants")?;
        for v in self.variants() {
            writeln!(f, "    {}", v)?;
        }
        let ops = self.operations();
        if !ops.is_empty() {
            writeln!(f, "  operations")?;
            for name in ops {
                if let Some(op) = self.operation(&name) {
                    writeln!(f, "    {} : {}", name, op.kind())?;
                }
            }
        }
        write!(f, "}}")
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::typeside::Value;

    fn peano() -> Family {
        let mut d = FamilyDecl::new("Peano");
        d.singleton("Zero")
         .variant("Succ", VariantDecl::new().field("pred", FieldSpec::SelfRef));
        d.define().unwrap()
    }

    #[test]
    fn test_define_family() {
        let p = peano();
        assert_eq!(p.variants().len(), 2);
        assert!(p.variant("Zero").unwrap().is_singleton());
        assert_eq!(p.variant("Succ").unwrap().recursive_fields(), &["pred".to_string()]);
    }

    #[test]
    fn test_unique_tags() {
        let p = peano();
        let z = p.variant("Zero").unwrap();
        let s = p.variant("Succ").unwrap();
        assert_ne!(z.tag(), s.tag());
    }

    #[test]
    fn test_duplicate_variant() {
        let mut d = FamilyDecl::new("Bad");
        d.singleton("A").singleton("A");
        let err = d.define().unwrap_err();
        assert!(matches!(err, AdtError::Declaration(DeclarationError::DuplicateVariant { .. })));
    }

    #[test]
    fn test_duplicate_field() {
        let mut d = FamilyDecl::new("Bad");
        d.variant(
            "Pair",
            VariantDecl::new()
                .field("x", BaseType::Int)
                .field("x", BaseType::Str),
        );
        let err = d.define().unwrap_err();
        assert_eq!(
            err,
            AdtError::Declaration(DeclarationError::DuplicateField {
                variant: "Pair".to_string(),
                field: "x".to_string(),
            })
        );
    }

    #[test]
    fn test_inheritors() {
        let p = peano();
        let mut d = FamilyDecl::extending("Child", &p);
        d.singleton("Extra");
        let child = d.define().unwrap();
        let grandchild = FamilyDecl::extending("GrandChild", &child).define().unwrap();

        let names: Vec<String> = p.inheritors("toValue").iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, vec!["Child", "GrandChild"]);

        drop(grandchild);
        assert_eq!(p.inheritors("toValue").len(), 1);
    }

    #[test]
    fn test_extension_inherits_variants() {
        let p = peano();
        let mut d = FamilyDecl::extending("ExtendedPeano", &p);
        d.variant("Pred", VariantDecl::new().field("succ", FieldSpec::SelfRef));
        let e = d.define().unwrap();

        assert_eq!(e.variants().len(), 3);
        assert_eq!(e.own_variants().len(), 1);
        // Même définition partagée, même étiquette
        assert_eq!(e.variant("Succ").unwrap().tag(), p.variant("Succ").unwrap().tag());
        assert!(e.descends_from(p.id()));
        assert!(!p.descends_from(e.id()));
        assert_eq!(e.extension().unwrap().parent, "Peano");
    }

    #[test]
    fn test_cannot_redeclare_inherited() {
        let p = peano();
        let mut d = FamilyDecl::extending("Again", &p);
        d.singleton("Zero");
        let err = d.define().unwrap_err();
        assert!(matches!(err, AdtError::Declaration(DeclarationError::InheritedVariant { .. })));
    }

    #[test]
    fn test_unknown_type_param() {
        let mut d = FamilyDecl::new("Box");
        d.variant("Box", VariantDecl::new().field("value", FieldSpec::param("T")));
        assert!(d.define().is_err());

        let mut d = FamilyDecl::new("Box");
        d.type_param("T")
         .variant("Box", VariantDecl::new().field("value", FieldSpec::param("T")));
        assert!(d.define().is_ok());
    }

    #[test]
    fn test_construct_unknown_variant() {
        let p = peano();
        let err = p.construct("Nope", FieldInput::empty()).unwrap_err();
        assert!(matches!(err, AdtError::UnknownVariant { .. }));
    }

    #[test]
    fn test_display() {
        let p = peano();
        let zero = p.singleton("Zero").unwrap();
        let one = p.construct("Succ", FieldInput::named([("pred", Value::Data(zero))])).unwrap();
        assert_eq!(format!("{}", one), "Succ(pred: Zero)");
        let shown = format!("{}", p);
        assert!(shown.contains("family Peano"));
        assert!(shown.contains("Succ(pred: Self)"));
    }
}
