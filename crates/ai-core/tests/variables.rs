use ai_core::{
    GlobalVariables, HostObject, Value, VarField, VarId, VarType, Variable, VariableError,
    VariableTable, Vec2, Vec3,
};
use proptest::prelude::*;

fn table() -> VariableTable {
    let mut t = VariableTable::new();
    t.declare(Variable::new(VarId(1), "hp", VarType::Int)).unwrap();
    t.declare(Variable::new(VarId(2), "alert", VarType::Bool)).unwrap();
    t.declare(Variable::new(VarId(3), "target", VarType::Vector2)).unwrap();
    t.declare(Variable::new(VarId(4), "label", VarType::String)).unwrap();
    t.declare(Variable::new(VarId(5), "any", VarType::Generic)).unwrap();
    t
}

#[test]
fn bool_and_numeric_coerce_both_ways() {
    let mut t = table();

    t.set_by_name("hp", true).unwrap();
    assert_eq!(t.get(VarId(1)).unwrap().value(), &Value::Int(1));

    t.set_by_name("alert", 0.0f32).unwrap();
    assert_eq!(t.get(VarId(2)).unwrap().value(), &Value::Bool(false));

    t.set_by_name("alert", -3).unwrap();
    assert_eq!(t.get(VarId(2)).unwrap().value(), &Value::Bool(true));

    t.set_by_name("hp", 2.9f32).unwrap();
    assert_eq!(t.get(VarId(1)).unwrap().value(), &Value::Int(2));
}

#[test]
fn vector3_projects_into_vector2() {
    let mut t = table();
    t.set(VarId(3), Vec3::new(1.0, 2.0, 3.0)).unwrap();
    assert_eq!(t.get(VarId(3)).unwrap().value(), &Value::Vector2(Vec2::new(1.0, 2.0)));

    let mut v3 = Variable::new(VarId(9), "pos", VarType::Vector3);
    v3.set(Vec2::new(4.0, 5.0)).unwrap();
    assert_eq!(v3.value(), &Value::Vector3(Vec3::new(4.0, 5.0, 0.0)));
}

#[test]
fn incompatible_writes_fail_and_keep_old_value() {
    let mut t = table();
    t.set_by_name("hp", 7).unwrap();

    let err = t.set_by_name("hp", "seven").unwrap_err();
    assert_eq!(
        err,
        VariableError::TypeMismatch {
            expected: VarType::Int,
            found: "string"
        }
    );
    assert_eq!(t.get(VarId(1)).unwrap().value(), &Value::Int(7));

    assert!(t.set_by_name("label", 3).is_err());
    assert!(t.set_by_name("hp", Vec2::ZERO).is_err());
}

#[test]
fn generic_slot_adopts_any_value() {
    let mut t = table();
    t.set_by_name("any", "text").unwrap();
    assert_eq!(t.get_by_name("any").unwrap().value(), &Value::from("text"));
    t.set_by_name("any", HostObject::new(42u32)).unwrap();
    match t.get_by_name("any").unwrap().value() {
        Value::Object(o) => assert_eq!(o.downcast_ref::<u32>(), Some(&42)),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn duplicate_declarations_are_rejected() {
    let mut t = table();
    assert_eq!(
        t.declare(Variable::new(VarId(1), "other", VarType::Int)),
        Err(VariableError::DuplicateId(VarId(1)))
    );
    assert_eq!(
        t.declare(Variable::new(VarId(77), "hp", VarType::Int)),
        Err(VariableError::DuplicateName("hp".to_string()))
    );
}

#[test]
fn constant_fields_are_read_only() {
    let mut t = table();
    let globals = GlobalVariables::new();
    let field = VarField::constant(5);

    assert_eq!(field.read(&t, &globals), Ok(Value::Int(5)));
    assert_eq!(field.write(&mut t, &globals, 6), Err(VariableError::ConstantField));
}

#[test]
fn bound_fields_defer_to_the_variable_after_resolution() {
    let mut t = table();
    let globals = GlobalVariables::new();
    globals
        .declare(Variable::new(VarId(1), "world_alarm", VarType::Bool))
        .unwrap();

    let mut local = VarField::local(1);
    let mut global = VarField::global(1);

    assert_eq!(local.read(&t, &globals), Err(VariableError::Unbound(VarId(1))));

    assert!(local.resolve(&t, &globals));
    assert!(global.resolve(&t, &globals));

    local.write(&mut t, &globals, 12).unwrap();
    global.write(&mut t, &globals, 1).unwrap();

    assert_eq!(local.read(&t, &globals), Ok(Value::Int(12)));
    assert_eq!(globals.get_by_name("world_alarm"), Some(Value::Bool(true)));
}

#[test]
fn unknown_binding_stays_unresolved() {
    let t = table();
    let globals = GlobalVariables::new();
    let mut field = VarField::local(404);
    assert!(!field.resolve(&t, &globals));
    assert_eq!(field.read(&t, &globals), Err(VariableError::Unbound(VarId(404))));
}

#[test]
fn cloned_tables_do_not_alias() {
    let a = table();
    let mut b = a.clone();
    b.set_by_name("hp", 99).unwrap();
    assert_eq!(a.get(VarId(1)).unwrap().value(), &Value::Int(0));
    assert_eq!(b.get(VarId(1)).unwrap().value(), &Value::Int(99));
}

#[test]
fn global_handles_share_one_table() {
    let globals = GlobalVariables::new();
    let other = globals.clone();
    globals
        .declare(Variable::new(VarId(1), "wave", VarType::Int))
        .unwrap();
    other.set_by_name("wave", 3).unwrap();
    assert_eq!(globals.get_by_name("wave"), Some(Value::Int(3)));
    assert!(globals.same_table(&other));
}

proptest! {
    #[test]
    fn numeric_to_bool_is_nonzero(i in any::<i32>()) {
        prop_assert_eq!(Value::Int(i).coerce(VarType::Bool), Ok(Value::Bool(i != 0)));
    }

    #[test]
    fn int_float_int_is_stable_for_small_ints(i in -1_000_000i32..1_000_000) {
        let f = Value::Int(i).coerce(VarType::Float).unwrap();
        prop_assert_eq!(f.coerce(VarType::Int), Ok(Value::Int(i)));
    }

    #[test]
    fn strings_never_coerce_into_numbers(s in ".*") {
        prop_assert!(Value::String(s.clone()).coerce(VarType::Int).is_err());
        prop_assert!(Value::String(s).coerce(VarType::Float).is_err());
    }
}
