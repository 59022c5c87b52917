// Fixtures partagées par les tests d'intégration.
#![allow(dead_code)]

use std::sync::Once;

use catadt::{
    BaseType, CodataDecl, FamilyDecl, Family, FieldInput, FieldSpec, FoldDecl, Instance, Interface,
    MapDecl, Observers, Signature, UnfoldDecl, Value, VariantDecl,
};

static INIT: Once = Once::new();

/// Traces visibles avec RUST_LOG=catadt=debug
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Peano = Zero | Succ(pred: Self), avec toValue et FromValue
pub fn peano() -> Family {
    let mut d = FamilyDecl::new("Peano");
    d.singleton("Zero")
     .variant("Succ", VariantDecl::new().field("pred", FieldSpec::SelfRef));
    d.define()
        .unwrap()
        .install_fold(
            "toValue",
            FoldDecl::new(BaseType::Int)
                .on("Zero", |_| Ok(Value::Int(0)))
                .on("Succ", |f| Ok(Value::Int(f.int("pred")? + 1))),
        )
        .unwrap()
        .install_unfold(
            "FromValue",
            UnfoldDecl::new(Signature::new(BaseType::Int, BaseType::Data))
                .case("Zero", |n, c| match n.as_int() {
                    Some(i) if i <= 0 => c.unit(),
                    _ => Ok(None),
                })
                .case("Succ", |n, c| match n.as_int() {
                    Some(i) => c.named([("pred", i - 1)]),
                    None => Ok(None),
                }),
        )
        .unwrap()
}

/// ExtendedPeano extends Peano = ...Peano | Pred(succ: Self)
pub fn extended_peano(peano: &Family) -> Family {
    let mut d = FamilyDecl::extending("ExtendedPeano", peano);
    d.variant("Pred", VariantDecl::new().field("succ", FieldSpec::SelfRef));
    d.define()
        .unwrap()
        .install_fold(
            "toValue",
            FoldDecl::new(BaseType::Int).on("Pred", |f| Ok(Value::Int(f.int("succ")? - 1))),
        )
        .unwrap()
}

/// List<T> = Nil | Cons(head: T, tail: Self)
pub fn list() -> Family {
    let mut d = FamilyDecl::new("List");
    d.type_param("T")
     .singleton("Nil")
     .variant(
         "Cons",
         VariantDecl::new()
             .field("head", FieldSpec::param("T"))
             .field("tail", FieldSpec::SelfRef),
     );
    d.define()
        .unwrap()
        .install_unfold(
            "counter",
            UnfoldDecl::new(Signature::new(BaseType::Int, BaseType::Data))
                .case("Nil", |n, c| match n.as_int() {
                    Some(i) if i <= 0 => c.unit(),
                    _ => Ok(None),
                })
                .case("Cons", |n, c| {
                    let i = n.as_int().unwrap_or(0);
                    c.named([("head", i), ("tail", i - 1)])
                }),
        )
        .unwrap()
        .install_fold(
            "length",
            FoldDecl::new(BaseType::Int)
                .on("Nil", |_| Ok(Value::Int(0)))
                .on("Cons", |f| Ok(Value::Int(f.int("tail")? + 1))),
        )
        .unwrap()
        .install_fold(
            "product",
            FoldDecl::new(BaseType::Int)
                .on("Nil", |_| Ok(Value::Int(1)))
                .on("Cons", |f| Ok(Value::Int(f.int("head")? * f.int("tail")?))),
        )
        .unwrap()
        .install_fold(
            "sum",
            FoldDecl::new(BaseType::Int)
                .on("Nil", |_| Ok(Value::Int(0)))
                .on("Cons", |f| Ok(Value::Int(f.int("head")? + f.int("tail")?))),
        )
        .unwrap()
        .install_map(
            "double",
            MapDecl::new().param("T", |v, _| Ok(Value::Int(v.as_int().unwrap_or(0) * 2))),
        )
        .unwrap()
}

/// Construit une List à partir d'entiers
pub fn list_of(list: &Family, items: &[i64]) -> Instance {
    let mut current = list.singleton("Nil").unwrap();
    for &i in items.iter().rev() {
        current = list
            .construct("Cons", FieldInput::positional([Value::Int(i), Value::Data(current)]))
            .unwrap();
    }
    current
}

/// Point = Point2D(x: Int, y: Int)
pub fn point() -> Family {
    let mut d = FamilyDecl::new("Point");
    d.variant(
        "Point2D",
        VariantDecl::new().field("x", BaseType::Int).field("y", BaseType::Int),
    );
    d.define().unwrap()
}

/// Rectangle = Rect(width, height, area) avec area = width * height
pub fn rectangle() -> Family {
    let mut d = FamilyDecl::new("Rectangle");
    d.variant(
        "Rect",
        VariantDecl::new()
            .field("width", BaseType::Int)
            .field("height", BaseType::Int)
            .field("area", BaseType::Int)
            .invariant("area = width * height", |f| {
                match (f.int("width"), f.int("height"), f.int("area")) {
                    (Ok(w), Ok(h), Ok(a)) => w * h == a,
                    _ => false,
                }
            }),
    );
    d.define().unwrap()
}

/// Tree = Leaf | Node(left: Self, value: Int, right: Self)
pub fn tree() -> Family {
    let mut d = FamilyDecl::new("Tree");
    d.singleton("Leaf").variant(
        "Node",
        VariantDecl::new()
            .field("left", FieldSpec::SelfRef)
            .field("value", BaseType::Int)
            .field("right", FieldSpec::SelfRef),
    );
    d.define()
        .unwrap()
        .install_fold(
            "inorder",
            FoldDecl::new(BaseType::List)
                .on("Leaf", |_| Ok(Value::List(Vec::new())))
                .on("Node", |f| {
                    let mut out = f.list("left")?.to_vec();
                    out.push(f.value("value")?.clone());
                    out.extend(f.list("right")?.iter().cloned());
                    Ok(Value::List(out))
                }),
        )
        .unwrap()
}

/// interface Stream { head: scalaire, tail: continuation }, avec countFrom
pub fn stream() -> Interface {
    let mut d = CodataDecl::new("Stream");
    d.scalar("head").continuation("tail");
    d.define()
        .unfold(
            "countFrom",
            Signature::new(BaseType::Int, BaseType::Codata),
            Observers::new()
                .scalar("head", |n| Ok(n.clone()))
                .continuation("tail", |n| Ok(Value::Int(n.as_int().unwrap_or(0) + 1))),
        )
        .unwrap()
}
