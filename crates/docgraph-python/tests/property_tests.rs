//! Invariants that hold for every mapped project

use docgraph::{format_args, ArgInfo, ArgPrefix, DisplayConfig, Entity, EntityKind, MemberOrder};
use docgraph_python::{LoaderConfig, MappedApi, PythonMapper, PythonParser, SourceParser};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A package exercising re-exports, wildcards, nesting and inheritance
fn sample_project(dir: &Path) {
    write(
        dir,
        "shop/__init__.py",
        "\"\"\"Shop.\"\"\"\nfrom .models import Item, Basket\nfrom .util import *\n",
    );
    write(
        dir,
        "shop/models.py",
        "\
from .base import Model

class Item(Model):
    \"\"\"An item.\"\"\"

    price: float = 0.0

    def __init__(self, name: str):
        self.name = name

    class Meta:
        ordering = ['name']

class Basket(Model):
    items = []

    def add(self, item: Item) -> None:
        \"\"\"Add an item.\"\"\"
",
    );
    write(
        dir,
        "shop/base.py",
        "\
class Model:
    \"\"\"Base model.\"\"\"

    def save(self):
        \"\"\"Persist.\"\"\"

    def add(self, other):
        \"\"\"Base add.\"\"\"
",
    );
    write(
        dir,
        "shop/util.py",
        "__all__ = ['slugify']\n\ndef slugify(text): ...\n\ndef _private(): ...\n",
    );
}

fn map(dir: &Path, display: DisplayConfig) -> MappedApi {
    let mut mapper = PythonMapper::new(LoaderConfig::new([dir.join("shop")]), display).unwrap();
    mapper.run().unwrap()
}

fn reachable(api: &MappedApi) -> Vec<&Entity> {
    api.modules.iter().flat_map(Entity::walk).collect()
}

#[test]
fn test_full_names_are_unique() {
    let dir = TempDir::new().unwrap();
    sample_project(dir.path());
    // Rebind a wildcard-imported name with an explicit import
    write(
        dir.path(),
        "shop/__init__.py",
        "\"\"\"Shop.\"\"\"\nfrom .models import Item, Basket\nfrom .util import *\nfrom .extra import slugify\n",
    );
    write(dir.path(), "shop/extra.py", "def slugify(text, sep='-'): ...\n");
    let api = map(dir.path(), DisplayConfig::default());

    let mut seen = HashSet::new();
    for entity in reachable(&api) {
        assert!(seen.insert(entity.full_name.clone()), "duplicate {}", entity.full_name);
    }
    assert!(seen.contains("shop.Item.Meta.ordering"));
    assert!(seen.contains("shop.models.Item.save"));

    let slugify = api.objects.lookup("shop.slugify").unwrap();
    assert_eq!(slugify.entity.original_path.as_deref(), Some("shop.extra.slugify"));
}

#[test]
fn test_no_placeholder_survives() {
    let dir = TempDir::new().unwrap();
    sample_project(dir.path());
    let api = map(dir.path(), DisplayConfig::default());

    assert!(reachable(&api)
        .iter()
        .all(|entity| entity.kind != EntityKind::Placeholder));
    assert_eq!(api.objects.len(), reachable(&api).len());
}

#[test]
fn test_children_follow_source_order() {
    let dir = TempDir::new().unwrap();
    sample_project(dir.path());
    let api = map(dir.path(), DisplayConfig::default().with_member_order(MemberOrder::Bysource));

    let item = api.objects.id_of("shop.models.Item").unwrap();
    let own: Vec<usize> = api
        .objects
        .children(item)
        .filter(|child| !child.inherited())
        .map(|child| child.entity.from_line.unwrap())
        .collect();
    let mut sorted = own.clone();
    sorted.sort_unstable();
    assert_eq!(own, sorted);

    let names: Vec<&str> = api.objects.children(item).map(|child| child.name()).collect();
    assert_eq!(&names[..4], &["price", "__init__", "name", "Meta"]);
}

#[test]
fn test_inherited_members_merge() {
    let dir = TempDir::new().unwrap();
    sample_project(dir.path());
    let api = map(dir.path(), DisplayConfig::default());

    let basket = api.objects.lookup("shop.models.Basket").unwrap();
    assert_eq!(basket.docstring, "Base model.");

    let add = api.objects.lookup("shop.models.Basket.add").unwrap();
    assert!(!add.inherited());
    assert_eq!(add.entity.doc, "Add an item.");

    let save = api.objects.lookup("shop.models.Basket.save").unwrap();
    assert!(save.inherited());
    assert_eq!(save.entity.doc, "Persist.");
    assert_eq!(
        save.entity.inherited_from.as_ref().map(|origin| origin.full_name.as_str()),
        Some("shop.base.Model")
    );

    let basket_id = api.objects.id_of("shop.models.Basket").unwrap();
    let mut names: Vec<&str> = api.objects.children(basket_id).map(|c| c.name()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["add", "items", "save"]);
}

#[test]
fn test_inherited_doc_fills_empty_doc() {
    let parser = PythonParser::new();
    let module = parser
        .parse_source(
            "\
class B:
    def run(self):
        \"\"\"Run it.\"\"\"

class D(B):
    def run(self, fast=True):
        pass
",
            "m",
            Path::new("m.py"),
            false,
        )
        .unwrap();
    let run = module.child("D").unwrap().child("run").unwrap();
    assert!(!run.inherited);
    assert_eq!(run.doc, "Run it.");
    assert_eq!(run.args, vec![ArgInfo::named("fast").with_default("True")]);
}

fn parse_args(signature: &str) -> Vec<ArgInfo> {
    let source = format!("def f({signature}):\n    pass\n");
    let module = PythonParser::new()
        .parse_source(&source, "m", Path::new("m.py"), false)
        .unwrap_or_else(|e| panic!("cannot parse ({signature}): {e}"));
    module.child("f").unwrap().args.clone()
}

#[test]
fn test_argument_formatting_round_trip() {
    let signatures = [
        "",
        "a",
        "a, b",
        "a, /",
        "a, /, b",
        "*, a",
        "a=1, *, b=2",
        "*args",
        "**kwargs",
        "*args, b=1, **kwargs",
        "a: int, b: str = 'x'",
        "a, /, *, b",
        "a: int = 1, /, b: List[int] = [], *args: str, c, d: bool = True, **kw: Any",
        "self, key: Tuple[int, ...], default: Optional[str] = None",
    ];

    for signature in signatures {
        let args = parse_args(signature);
        let formatted = format_args(&args, true, None);
        assert_eq!(formatted, signature, "formatting of ({signature})");
        assert_eq!(parse_args(&formatted), args, "round trip of ({signature})");
    }
}

#[test]
fn test_argument_structure() {
    let args = parse_args("a, /, b=2, *args: int, c, **kw");
    assert_eq!(
        args,
        vec![
            ArgInfo::named("a"),
            ArgInfo::sentinel(ArgPrefix::Slash),
            ArgInfo::named("b").with_default("2"),
            ArgInfo::variadic(ArgPrefix::Star, "args").with_annotation("int"),
            ArgInfo::named("c"),
            ArgInfo::variadic(ArgPrefix::DoubleStar, "kw"),
        ]
    );
    assert_eq!(format_args(&args, false, None), "a, /, b=2, *args, c, **kw");
    assert_eq!(format_args(&parse_args("self, x"), true, Some("self")), "x");
}

#[test]
fn test_overload_aggregation() {
    let variants = ["int", "str", "bytes", "float"];
    for count in 1..=variants.len() {
        let mut source = String::from("from typing import overload\n\n");
        for annotation in &variants[..count] {
            source.push_str(&format!("@overload\ndef h(v: {annotation}) -> {annotation}: ...\n"));
        }
        source.push_str("def h(v, *, exact=False):\n    return v\n");

        let module = PythonParser::new()
            .parse_source(&source, "m", Path::new("m.py"), false)
            .unwrap();
        assert_eq!(module.children.len(), 1);
        let h = module.child("h").unwrap();
        assert_eq!(h.overloads.len(), count);
        for (overload, annotation) in h.overloads.iter().zip(variants) {
            assert_eq!(overload.return_annotation.as_deref(), Some(annotation));
        }
        assert_eq!(
            h.args,
            vec![
                ArgInfo::named("v"),
                ArgInfo::sentinel(ArgPrefix::Star),
                ArgInfo::named("exact").with_default("False"),
            ]
        );
    }
}
