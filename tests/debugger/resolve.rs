use crate::common::{Call, FakeProcess, CLASS_TYPE, NOT_FOUND};
use remora::config::EvalConfig;
use remora::debugger::eval::{DeclaredType, TypeResolver};
use remora::debugger::{Error, ObjectRef, RemoteError, ThreadRef, TypeKind, TypeRef, Value};

const THREAD: ThreadRef = ThreadRef(1);

#[test]
fn test_resolve() {
    struct TestCase {
        name: &'static str,
        /// (type, class object, loadable by name)
        types: Vec<(u64, u64, bool)>,
        expected: Option<TypeRef>,
    }
    let test_cases = vec![
        TestCase {
            name: "no loaded types",
            types: vec![],
            expected: None,
        },
        TestCase {
            name: "single type",
            types: vec![(10, 100, true)],
            expected: Some(TypeRef(10)),
        },
        TestCase {
            name: "single type, loader does not know it",
            types: vec![(10, 100, false)],
            expected: Some(TypeRef(10)),
        },
        TestCase {
            name: "two types, disambiguated by class object",
            types: vec![(10, 100, false), (11, 101, true)],
            expected: Some(TypeRef(11)),
        },
        TestCase {
            name: "two types, no disambiguator",
            types: vec![(10, 100, false), (11, 101, false)],
            expected: None,
        },
    ];

    let config = EvalConfig::default();
    for tc in test_cases {
        let process = FakeProcess::new();
        for (ty, class_object, loadable) in &tc.types {
            process.add_type("app.Point", TypeRef(*ty), ObjectRef(*class_object), *loadable);
        }

        let resolver = TypeResolver::new(&*process, THREAD, &config);
        let result = resolver.resolve("app.Point");
        match tc.expected {
            Some(expected) => assert_eq!(result.unwrap(), expected, "{}", tc.name),
            None => assert!(
                matches!(result, Err(Error::UnresolvableType(ref name)) if name == "app.Point"),
                "{}",
                tc.name
            ),
        }
    }
}

#[test]
fn test_inconsistent_class_object() {
    let process = FakeProcess::new();
    process.add_type("app.Point", TypeRef(10), ObjectRef(100), false);
    process.add_type("app.Point", TypeRef(11), ObjectRef(101), false);
    // loader returns a class object of neither candidate
    process.set_loadable("app.Point", ObjectRef(102));

    let config = EvalConfig::default();
    let resolver = TypeResolver::new(&*process, THREAD, &config);
    assert!(matches!(
        resolver.resolve("app.Point"),
        Err(Error::UnresolvableType(_))
    ));
}

#[test]
fn test_forced_load_comes_first() {
    let process = FakeProcess::new();
    process.add_type("app.Point", TypeRef(10), ObjectRef(100), true);

    let config = EvalConfig::default();
    let resolver = TypeResolver::new(&*process, THREAD, &config);
    resolver.resolve("app.Point").unwrap();

    assert_eq!(
        process.calls(),
        vec![
            Call::AllTypes("java.lang.Class".to_string()),
            Call::InvokeStatic {
                ty: CLASS_TYPE,
                method: "forName".to_string()
            },
            Call::AllTypes("app.Point".to_string()),
        ]
    );
}

#[test]
fn test_load_or_find() {
    let process = FakeProcess::new();
    process.add_type("app.Point", TypeRef(10), ObjectRef(100), true);

    let config = EvalConfig::default();
    let resolver = TypeResolver::new(&*process, THREAD, &config);
    assert_eq!(
        resolver.load_or_find("app.Point").unwrap(),
        Some(ObjectRef(100))
    );
    // not found exception of the loader is not an error
    assert_eq!(resolver.load_or_find("app.Missing").unwrap(), None);
}

#[test]
fn test_load_failure_propagates() {
    struct TestCase {
        failure: RemoteError,
        not_found: bool,
    }
    let test_cases = vec![
        TestCase {
            failure: RemoteError::Invocation {
                exception: ObjectRef(5),
                exception_type: NOT_FOUND.to_string(),
            },
            not_found: true,
        },
        TestCase {
            failure: RemoteError::Invocation {
                exception: ObjectRef(5),
                exception_type: "java.lang.LinkageError".to_string(),
            },
            not_found: false,
        },
        TestCase {
            failure: RemoteError::Disconnected,
            not_found: false,
        },
    ];

    let config = EvalConfig::default();
    for tc in test_cases {
        let process = FakeProcess::new();
        process.add_type("app.Point", TypeRef(10), ObjectRef(100), true);
        process.fail_loading(tc.failure.clone());

        let resolver = TypeResolver::new(&*process, THREAD, &config);
        let result = resolver.load_or_find("app.Point");
        if tc.not_found {
            assert_eq!(result.unwrap(), None);
            // single loaded type is resolved without the loader
            assert_eq!(resolver.resolve("app.Point").unwrap(), TypeRef(10));
        } else {
            assert!(matches!(result, Err(Error::Remote(ref e)) if *e == tc.failure));
        }
    }
}

#[test]
fn test_ambiguous_class_type() {
    let process = FakeProcess::new();
    process.add_type("java.lang.Class", TypeRef(2), ObjectRef(2), false);
    process.add_type("app.Point", TypeRef(10), ObjectRef(100), true);

    let config = EvalConfig::default();
    let resolver = TypeResolver::new(&*process, THREAD, &config);
    assert!(matches!(
        resolver.resolve("app.Point"),
        Err(Error::UnresolvableType(ref name)) if name == "java.lang.Class"
    ));
}

#[test]
fn test_declared_types() {
    let process = FakeProcess::new();
    process.add_type("app.Point", TypeRef(10), ObjectRef(100), true);

    let config = EvalConfig::default();
    let resolver = TypeResolver::new(&*process, THREAD, &config);
    assert_eq!(
        resolver.resolve_declared("long").unwrap(),
        DeclaredType::Primitive(TypeKind::Long)
    );
    assert_eq!(
        resolver.resolve_declared("app.Point").unwrap(),
        DeclaredType::Reference(TypeRef(10))
    );
    assert!(resolver.resolve_declared("void").is_err());
    assert_eq!(
        resolver.class_object("app.Point").unwrap(),
        Value::ObjectRef(ObjectRef(100))
    );
}
