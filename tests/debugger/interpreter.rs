use crate::common::{started_target, Call, FakeProcess, TestHooks};
use remora::debugger::eval::{BinaryOp, Instruction, Literal, UnaryOp};
use remora::debugger::{
    DebugTarget, Error, EvalContext, EvalOutcome, Interpreter, ObjectRef, RemoteError, ThreadRef,
    TypeRef, Value,
};
use remora::log::NopReporter;
use std::sync::Arc;

fn interpreter(program: Vec<Instruction>) -> Interpreter {
    Interpreter::new(program).with_reporter(Arc::new(NopReporter))
}

fn eval(target: &DebugTarget, program: Vec<Instruction>) -> Result<EvalOutcome, Error> {
    let ctx = EvalContext::current(target)?;
    interpreter(program).run(&ctx)
}

fn completed(outcome: Result<EvalOutcome, Error>) -> Value {
    match outcome {
        Ok(EvalOutcome::Completed(Some(value))) => value,
        other => panic!("unexpected outcome: {other:?}"),
    }
}

fn lit(literal: impl Into<Literal>) -> Instruction {
    Instruction::PushLiteral(literal.into())
}

fn local(name: &str) -> Instruction {
    Instruction::PushLocalVariable {
        name: name.to_string(),
    }
}

fn internal(name: &str) -> Instruction {
    Instruction::PushInternalVariable {
        name: name.to_string(),
    }
}

fn create(name: &str, type_name: &str) -> Instruction {
    Instruction::CreateInternalVariable {
        name: name.to_string(),
        type_name: type_name.to_string(),
    }
}

fn send(selector: &str, arg_count: usize) -> Instruction {
    Instruction::SendMessage {
        selector: selector.to_string(),
        signature: "()V".to_string(),
        arg_count,
        non_virtual: false,
    }
}

#[test]
fn test_arithmetic() {
    let process = FakeProcess::new();
    let target = started_target(&process, TestHooks::default(), &[1]);

    let ctx = EvalContext::current(&target).unwrap();
    let mut interp = interpreter(vec![lit(2), lit(3), Instruction::Binary(BinaryOp::Add)]);
    assert_eq!(
        interp.run(&ctx).unwrap(),
        EvalOutcome::Completed(Some(Value::Int(5)))
    );
    assert_eq!(interp.stack_depth(), 1);

    let value = completed(eval(
        &target,
        vec![
            lit(Literal::Char(97)),
            lit(1),
            Instruction::Binary(BinaryOp::Add),
            lit(Literal::Long(10)),
            Instruction::Binary(BinaryOp::Mul),
            Instruction::Unary(UnaryOp::Minus),
        ],
    ));
    assert_eq!(value, Value::Long(-980));

    // evaluation of local arithmetic never talks to the target
    assert!(process.calls().is_empty());
}

#[test]
fn test_string_concatenation() {
    let process = FakeProcess::new();
    let target = started_target(&process, TestHooks::default(), &[1]);
    let point = process.add_string("Point(1, 2)");
    process.set_method("toString", Value::StringRef(point));
    process.set_this(Value::ObjectRef(ObjectRef(70)));

    let value = completed(eval(
        &target,
        vec![lit("x = "), lit(5), Instruction::Binary(BinaryOp::Add)],
    ));
    assert_eq!(process.text(value), "x = 5");

    let value = completed(eval(
        &target,
        vec![
            Instruction::PushThis,
            lit(" or "),
            Instruction::Binary(BinaryOp::Add),
            Instruction::PushNull,
            Instruction::Binary(BinaryOp::Add),
        ],
    ));
    assert_eq!(process.text(value), "Point(1, 2) or null");
    assert_eq!(
        process.calls_of(|c| matches!(c, Call::InvokeMethod { .. })),
        vec![Call::InvokeMethod {
            receiver: ObjectRef(70),
            method: "toString".to_string()
        }]
    );

    let err = eval(
        &target,
        vec![lit("a"), lit(1), Instruction::Binary(BinaryOp::Sub)],
    )
    .unwrap_err();
    assert!(matches!(err, Error::IllegalPromotion { .. }));
}

#[test]
fn test_locals_and_fields() {
    let process = FakeProcess::new();
    let target = started_target(&process, TestHooks::default(), &[1]);
    process.set_local("x", Value::Int(5));
    process.set_this(Value::ObjectRef(ObjectRef(70)));
    process.set_field(ObjectRef(70), "count", Value::Int(3));
    process.add_type("app.Config", TypeRef(20), ObjectRef(200), true);
    process.set_static_field(TypeRef(20), "LIMIT", Value::Long(10));

    let value = completed(eval(
        &target,
        vec![local("x"), lit(10), Instruction::Binary(BinaryOp::Mul)],
    ));
    assert_eq!(value, Value::Int(50));

    let value = completed(eval(
        &target,
        vec![
            Instruction::PushThis,
            Instruction::PushField {
                name: "count".to_string(),
            },
            lit(1),
            Instruction::Binary(BinaryOp::Add),
        ],
    ));
    assert_eq!(value, Value::Int(4));

    // variable on top of the stack is read for the result
    let value = completed(eval(
        &target,
        vec![Instruction::PushStaticField {
            type_name: "app.Config".to_string(),
            name: "LIMIT".to_string(),
        }],
    ));
    assert_eq!(value, Value::Long(10));

    let err = eval(
        &target,
        vec![
            Instruction::PushNull,
            Instruction::PushField {
                name: "count".to_string(),
            },
        ],
    )
    .unwrap_err();
    assert!(matches!(err, Error::NullReceiver));
}

#[test]
fn test_assignment() {
    let process = FakeProcess::new();
    let target = started_target(&process, TestHooks::default(), &[1]);
    process.set_local("x", Value::Int(5));
    process.set_local("b", Value::Byte(127));
    process.set_this(Value::ObjectRef(ObjectRef(70)));
    process.set_field(ObjectRef(70), "count", Value::Int(3));

    let value = completed(eval(&target, vec![local("x"), lit(7), Instruction::Assign]));
    assert_eq!(value, Value::Int(7));
    assert_eq!(process.local("x"), Some(Value::Int(7)));

    // compound assignment narrows back to the variable kind
    let value = completed(eval(
        &target,
        vec![local("b"), lit(1), Instruction::CompoundAssign(BinaryOp::Add)],
    ));
    assert_eq!(value, Value::Byte(-128));
    assert_eq!(process.local("b"), Some(Value::Byte(-128)));

    completed(eval(
        &target,
        vec![
            Instruction::PushThis,
            Instruction::PushField {
                name: "count".to_string(),
            },
            lit(2),
            Instruction::CompoundAssign(BinaryOp::Shl),
        ],
    ));
    assert_eq!(
        process.calls_of(|c| matches!(c, Call::SetLocal(..) | Call::SetField(..))),
        vec![
            Call::SetLocal("x".to_string(), Value::Int(7)),
            Call::SetLocal("b".to_string(), Value::Byte(-128)),
            Call::SetField(ObjectRef(70), "count".to_string(), Value::Int(12)),
        ]
    );

    let err = eval(&target, vec![lit(1), lit(2), Instruction::Assign]).unwrap_err();
    assert!(matches!(err, Error::InvalidOperand(_)));
}

#[test]
fn test_assignment_conversion() {
    let process = FakeProcess::new();
    let target = started_target(&process, TestHooks::default(), &[1]);
    process.set_local("l", Value::Long(0));
    process.set_local("flag", Value::Boolean(false));
    let weights = process.add_array(vec![Value::Double(0.5)]);
    process.set_local("weights", Value::ObjectRef(weights));

    // long l = 5
    let value = completed(eval(&target, vec![local("l"), lit(5), Instruction::Assign]));
    assert_eq!(value, Value::Long(5));
    assert_eq!(process.local("l"), Some(Value::Long(5)));

    // weights[0] = 'a'
    completed(eval(
        &target,
        vec![
            local("weights"),
            lit(0),
            Instruction::ArrayAccess,
            lit(Literal::Char(97)),
            Instruction::Assign,
        ],
    ));
    assert_eq!(process.array(weights), vec![Value::Double(97.0)]);

    let err = eval(&target, vec![local("flag"), lit(1), Instruction::Assign]).unwrap_err();
    assert!(matches!(err, Error::InvalidCast { .. }));
    assert_eq!(process.local("flag"), Some(Value::Boolean(false)));
}

#[test]
fn test_arrays() {
    let process = FakeProcess::new();
    let target = started_target(&process, TestHooks::default(), &[1]);
    let arr = process.add_array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    process.set_local("arr", Value::ObjectRef(arr));
    process.add_type("int[]", TypeRef(30), ObjectRef(300), true);

    let value = completed(eval(
        &target,
        vec![
            local("arr"),
            lit(1),
            Instruction::ArrayAccess,
            lit(20),
            Instruction::Assign,
        ],
    ));
    assert_eq!(value, Value::Int(20));
    assert_eq!(
        process.array(arr),
        vec![Value::Int(1), Value::Int(20), Value::Int(3)]
    );

    let value = completed(eval(&target, vec![local("arr"), Instruction::ArrayLength]));
    assert_eq!(value, Value::Int(3));

    let value = completed(eval(
        &target,
        vec![
            lit(4),
            Instruction::ArrayAllocation {
                array_type: "int[]".to_string(),
            },
            Instruction::ArrayLength,
        ],
    ));
    assert_eq!(value, Value::Int(4));
    assert_eq!(
        process.calls_of(|c| matches!(c, Call::NewArray(..))),
        vec![Call::NewArray(TypeRef(30), 4)]
    );

    let err = eval(
        &target,
        vec![
            lit(-1),
            Instruction::ArrayAllocation {
                array_type: "int[]".to_string(),
            },
        ],
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidOperand(_)));

    process.add_type("app.Point", TypeRef(10), ObjectRef(100), true);
    process.clear_calls();
    let err = eval(
        &target,
        vec![
            lit(2),
            Instruction::ArrayAllocation {
                array_type: "app.Point".to_string(),
            },
        ],
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidOperand(_)));
    assert!(process
        .calls_of(|c| matches!(c, Call::NewArray(..)))
        .is_empty());
}

#[test]
fn test_internal_variables() {
    let process = FakeProcess::new();
    let target = started_target(&process, TestHooks::default(), &[1]);
    let ctx = EvalContext::current(&target).unwrap();

    let mut interp = interpreter(vec![
        create("i", "int"),
        internal("i"),
        lit(Literal::Char(65)),
        Instruction::Assign,
    ]);
    assert_eq!(
        interp.run(&ctx).unwrap(),
        EvalOutcome::Completed(Some(Value::Int(65)))
    );
    assert_eq!(
        interp.internal_variables().get("i").unwrap().value,
        Value::Int(65)
    );
    // internals live for a single run
    assert_eq!(
        interp.run(&ctx).unwrap(),
        EvalOutcome::Completed(Some(Value::Int(65)))
    );

    let err = eval(&target, vec![create("i", "int"), create("i", "long")]).unwrap_err();
    assert!(matches!(err, Error::InternalVariableExists(ref name) if name == "i"));

    let err = eval(&target, vec![internal("j")]).unwrap_err();
    assert!(matches!(err, Error::InternalVariableNotFound(ref name) if name == "j"));

    let err = eval(
        &target,
        vec![create("flag", "boolean"), internal("flag"), lit(1), Instruction::Assign],
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidCast { .. }));
}

#[test]
fn test_loop() {
    let process = FakeProcess::new();
    let target = started_target(&process, TestHooks::default(), &[1]);

    // int i = 0, sum = 0; while (i < 3) { i += 1; sum += i; } sum
    let program = vec![
        create("i", "int"),
        create("sum", "int"),
        internal("i"),
        lit(3),
        Instruction::Binary(BinaryOp::Less),
        Instruction::ConditionalJump {
            offset: 9,
            jump_on: false,
        },
        internal("i"),
        lit(1),
        Instruction::CompoundAssign(BinaryOp::Add),
        Instruction::Pop,
        internal("sum"),
        internal("i"),
        Instruction::CompoundAssign(BinaryOp::Add),
        Instruction::Pop,
        Instruction::Jump(-13),
        internal("sum"),
    ];
    let ctx = EvalContext::current(&target).unwrap();
    let mut interp = interpreter(program);
    assert_eq!(
        interp.run(&ctx).unwrap(),
        EvalOutcome::Completed(Some(Value::Int(6)))
    );
    assert_eq!(interp.stack_depth(), 1);
}

#[test]
fn test_control_flow() {
    struct TestCase {
        name: &'static str,
        program: Vec<Instruction>,
        expected: Result<Option<Value>, isize>,
    }
    let test_cases = vec![
        TestCase {
            name: "empty program has no value",
            program: vec![],
            expected: Ok(None),
        },
        TestCase {
            name: "popped value is a result",
            program: vec![lit(1), Instruction::Pop],
            expected: Ok(Some(Value::Int(1))),
        },
        TestCase {
            name: "return stops the program",
            program: vec![lit(1), Instruction::Return, lit(2)],
            expected: Ok(Some(Value::Int(1))),
        },
        TestCase {
            name: "jump to the program end",
            program: vec![lit(1), Instruction::Jump(1), lit(2)],
            expected: Ok(Some(Value::Int(1))),
        },
        TestCase {
            name: "conditional jump is not taken",
            program: vec![
                lit(false),
                Instruction::ConditionalJump {
                    offset: 1,
                    jump_on: true,
                },
                lit(2),
                Instruction::NoOp,
            ],
            expected: Ok(Some(Value::Int(2))),
        },
        TestCase {
            name: "dup keeps a copy",
            program: vec![
                lit(3),
                Instruction::Dup,
                Instruction::Binary(BinaryOp::Mul),
            ],
            expected: Ok(Some(Value::Int(9))),
        },
        TestCase {
            name: "jump past the end",
            program: vec![Instruction::Jump(5)],
            expected: Err(6),
        },
        TestCase {
            name: "jump before the start",
            program: vec![Instruction::Jump(-2)],
            expected: Err(-1),
        },
        TestCase {
            name: "huge forward offset",
            program: vec![Instruction::NoOp, Instruction::Jump(isize::MAX)],
            expected: Err(isize::MAX),
        },
        TestCase {
            name: "huge backward offset",
            program: vec![
                lit(true),
                Instruction::ConditionalJump {
                    offset: isize::MIN,
                    jump_on: true,
                },
            ],
            expected: Err(isize::MIN + 2),
        },
    ];

    let process = FakeProcess::new();
    let target = started_target(&process, TestHooks::default(), &[1]);
    for tc in test_cases {
        let result = eval(&target, tc.program);
        match tc.expected {
            Ok(value) => assert_eq!(
                result.unwrap(),
                EvalOutcome::Completed(value),
                "{}",
                tc.name
            ),
            Err(jump) => assert!(
                matches!(result, Err(Error::JumpOutOfRange(j)) if j == jump),
                "{}",
                tc.name
            ),
        }
    }
}

#[test]
fn test_error_discards_state() {
    let process = FakeProcess::new();
    let target = started_target(&process, TestHooks::default(), &[1]);
    let ctx = EvalContext::current(&target).unwrap();

    let mut interp = interpreter(vec![
        create("i", "int"),
        lit(7),
        lit(1),
        lit(0),
        Instruction::Binary(BinaryOp::Div),
    ]);
    assert!(matches!(interp.run(&ctx), Err(Error::DivisionByZero)));
    assert_eq!(interp.stack_depth(), 0);
    assert!(!interp.internal_variables().contains("i"));

    let err = eval(&target, vec![Instruction::Binary(BinaryOp::Add)]).unwrap_err();
    assert!(matches!(err, Error::StackUnderflow));
}

#[test]
fn test_cast_and_instanceof() {
    let process = FakeProcess::new();
    let target = started_target(&process, TestHooks::default(), &[1]);
    process.add_type("app.Shape", TypeRef(40), ObjectRef(400), true);
    process.add_type("app.Circle", TypeRef(41), ObjectRef(401), true);
    process.add_type("app.Square", TypeRef(42), ObjectRef(402), true);
    process.add_object(ObjectRef(77), TypeRef(41));
    process.add_assignable(TypeRef(41), TypeRef(40));
    process.set_local("c", Value::ObjectRef(ObjectRef(77)));

    let instance_of = |type_name: &str| Instruction::InstanceOf {
        type_name: type_name.to_string(),
    };
    let cast = |type_name: &str| Instruction::Cast {
        type_name: type_name.to_string(),
    };

    assert_eq!(
        completed(eval(&target, vec![local("c"), instance_of("app.Shape")])),
        Value::Boolean(true)
    );
    assert_eq!(
        completed(eval(&target, vec![local("c"), instance_of("app.Square")])),
        Value::Boolean(false)
    );
    assert_eq!(
        completed(eval(&target, vec![Instruction::PushNull, instance_of("app.Shape")])),
        Value::Boolean(false)
    );

    assert_eq!(
        completed(eval(&target, vec![local("c"), cast("app.Shape")])),
        Value::ObjectRef(ObjectRef(77))
    );
    assert_eq!(
        completed(eval(&target, vec![Instruction::PushNull, cast("app.Square")])),
        Value::Null
    );
    let err = eval(&target, vec![local("c"), cast("app.Square")]).unwrap_err();
    assert!(matches!(err, Error::InvalidCast { ref to, .. } if to == "app.Square"));

    assert_eq!(
        completed(eval(&target, vec![lit(Literal::Double(3.9)), cast("int")])),
        Value::Int(3)
    );
    assert_eq!(
        completed(eval(&target, vec![lit(300), cast("byte")])),
        Value::Byte(44)
    );
    let err = eval(&target, vec![lit(true), cast("int")]).unwrap_err();
    assert!(matches!(err, Error::InvalidCast { .. }));
}

#[test]
fn test_invocations() {
    let process = FakeProcess::new();
    let target = started_target(&process, TestHooks::default(), &[1]);
    process.add_type("app.Point", TypeRef(10), ObjectRef(100), true);
    process.set_method("max", Value::Int(9));
    process.set_method("norm", Value::Double(2.5));

    let point = completed(eval(
        &target,
        vec![
            lit(1),
            lit(2),
            Instruction::Constructor {
                type_name: "app.Point".to_string(),
                signature: "(II)V".to_string(),
                arg_count: 2,
            },
        ],
    ));
    assert!(matches!(point, Value::ObjectRef(_)));
    assert_eq!(
        process.calls_of(|c| matches!(c, Call::NewInstance(_))),
        vec![Call::NewInstance(TypeRef(10))]
    );

    process.clear_calls();
    let value = completed(eval(
        &target,
        vec![
            lit(4),
            lit(9),
            Instruction::SendStaticMessage {
                type_name: "app.Point".to_string(),
                selector: "max".to_string(),
                signature: "(II)I".to_string(),
                arg_count: 2,
            },
        ],
    ));
    assert_eq!(value, Value::Int(9));
    assert!(process.calls().contains(&Call::InvokeStatic {
        ty: TypeRef(10),
        method: "max".to_string()
    }));

    process.set_local("p", point);
    let value = completed(eval(&target, vec![local("p"), send("norm", 0)]));
    assert_eq!(value, Value::Double(2.5));

    let value = completed(eval(
        &target,
        vec![Instruction::PushClassObject {
            type_name: "app.Point".to_string(),
        }],
    ));
    assert_eq!(value, Value::ObjectRef(ObjectRef(100)));

    let err = eval(
        &target,
        vec![Instruction::PushClassObject {
            type_name: "app.Missing".to_string(),
        }],
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnresolvableType(ref name) if name == "app.Missing"));
}

#[test]
fn test_stop_between_instructions() {
    let process = FakeProcess::new();
    let target = started_target(&process, TestHooks::default(), &[1]);
    process.set_this(Value::ObjectRef(ObjectRef(70)));
    process.set_local("x", Value::Int(5));

    let mut interp = interpreter(vec![
        Instruction::PushThis,
        send("tick", 0),
        Instruction::Pop,
        local("x"),
        lit(9),
        Instruction::Assign,
    ]);
    let stop = interp.stop_handle();
    // stop request arrives while a remote call is in progress
    process.on_invoke(move |_| stop.stop());

    let ctx = EvalContext::current(&target).unwrap();
    assert_eq!(interp.run(&ctx).unwrap(), EvalOutcome::Cancelled);
    assert!(!interp.is_running());
    assert_eq!(interp.stack_depth(), 0);
    assert_eq!(process.local("x"), Some(Value::Int(5)));
    assert!(process
        .calls_of(|c| matches!(c, Call::SetLocal(..)))
        .is_empty());

    // stopped interpreter stays stopped
    assert_eq!(interp.run(&ctx).unwrap(), EvalOutcome::Cancelled);
}

#[test]
fn test_stop_before_run() {
    let process = FakeProcess::new();
    let target = started_target(&process, TestHooks::default(), &[1]);

    let mut interp = interpreter(vec![lit("never created")]);
    interp.stop();
    let ctx = EvalContext::current(&target).unwrap();
    assert_eq!(interp.run(&ctx).unwrap(), EvalOutcome::Cancelled);
    assert!(process.calls().is_empty());
}

#[test]
fn test_evaluation_context() {
    let process = FakeProcess::new();
    let target = started_target(&process, TestHooks::default(), &[1, 2]);

    let ctx = EvalContext::current(&target).unwrap();
    assert_eq!(ctx.thread, ThreadRef(1));
    assert_eq!(ctx.frame, 0);

    target.set_focus(ThreadRef(2)).unwrap();
    assert_eq!(EvalContext::current(&target).unwrap().thread, ThreadRef(2));

    target.resume().unwrap();
    assert!(matches!(
        EvalContext::current(&target),
        Err(Error::NoCurrentThread)
    ));

    // explicit context of a terminated target
    target.exclusive(|t| t.handle_vm_death());
    let ctx = EvalContext::new(&target, ThreadRef(1), 0);
    assert!(matches!(
        interpreter(vec![lit(1)]).run(&ctx),
        Err(Error::TargetTerminated)
    ));
}

#[test]
fn test_disconnect_during_evaluation() {
    let process = FakeProcess::new();
    let target = started_target(&process, TestHooks::default(), &[1]);
    process.set_local("x", Value::Int(5));
    process.disconnect();

    let err = eval(&target, vec![local("x"), lit(1), Instruction::Assign]).unwrap_err();
    assert!(matches!(err, Error::Remote(RemoteError::Disconnected)));
    assert!(err.is_fatal());
}
