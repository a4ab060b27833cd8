use crate::{EffectKind, SimState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    Bool(bool),
    Number(f64),
    String(String),
    Ident(String),
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    Bool(bool),
    Num(f64),
    Str(String),
    None,
}

impl EvalValue {
    pub fn truthy(&self) -> bool {
        match self {
            EvalValue::Bool(value) => *value,
            EvalValue::Num(value) => *value != 0.0,
            EvalValue::Str(value) => !value.is_empty(),
            EvalValue::None => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            EvalValue::Num(value) => Some(*value),
            EvalValue::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
            EvalValue::Str(value) => value.parse::<f64>().ok(),
            EvalValue::None => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            EvalValue::Str(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Side-effect-free expression evaluation against a state snapshot and the
/// decision point's variable bindings. Unresolvable expressions collapse to
/// `EvalValue::None`, which is falsy, so malformed rules never abort a run.
pub fn evaluate(expr: &Expr, state: &SimState, vars: &HashMap<String, f64>) -> EvalValue {
    match expr {
        Expr::Bool(value) => EvalValue::Bool(*value),
        Expr::Number(value) => EvalValue::Num(*value),
        Expr::String(value) => EvalValue::Str(normalize(value)),
        Expr::Ident(value) => eval_ident(value, state, vars),
        Expr::Call { name, args } => eval_call(name, args, state, vars),
        Expr::Unary { op, expr } => {
            let inner = evaluate(expr, state, vars);
            match op {
                UnaryOp::Not => EvalValue::Bool(!inner.truthy()),
                UnaryOp::Neg => inner
                    .as_number()
                    .map(|v| EvalValue::Num(-v))
                    .unwrap_or(EvalValue::None),
            }
        }
        Expr::Binary { left, op, right } => {
            let left_val = evaluate(left, state, vars);
            let right_val = evaluate(right, state, vars);
            match op {
                BinaryOp::Or => EvalValue::Bool(left_val.truthy() || right_val.truthy()),
                BinaryOp::And => EvalValue::Bool(left_val.truthy() && right_val.truthy()),
                BinaryOp::Eq => EvalValue::Bool(values_equal(&left_val, &right_val)),
                BinaryOp::Ne => EvalValue::Bool(!values_equal(&left_val, &right_val)),
                BinaryOp::Lt => EvalValue::Bool(compare_numbers(&left_val, &right_val, |a, b| a < b)),
                BinaryOp::Le => {
                    EvalValue::Bool(compare_numbers(&left_val, &right_val, |a, b| a <= b))
                }
                BinaryOp::Gt => EvalValue::Bool(compare_numbers(&left_val, &right_val, |a, b| a > b)),
                BinaryOp::Ge => {
                    EvalValue::Bool(compare_numbers(&left_val, &right_val, |a, b| a >= b))
                }
                BinaryOp::Add => combine_numbers(&left_val, &right_val, |a, b| a + b),
                BinaryOp::Sub => combine_numbers(&left_val, &right_val, |a, b| a - b),
                BinaryOp::Mul => combine_numbers(&left_val, &right_val, |a, b| a * b),
                BinaryOp::Div => combine_numbers(&left_val, &right_val, |a, b| {
                    if b == 0.0 {
                        a
                    } else {
                        a / b
                    }
                }),
            }
        }
    }
}

pub fn condition_holds(expr: &Expr, state: &SimState, vars: &HashMap<String, f64>) -> bool {
    evaluate(expr, state, vars).truthy()
}

fn eval_ident(ident: &str, state: &SimState, vars: &HashMap<String, f64>) -> EvalValue {
    let key = normalize(ident);
    if let Some(value) = vars.get(&key) {
        return EvalValue::Num(*value);
    }
    match key.as_str() {
        "time" => return EvalValue::Num(state.time),
        "time_left" => {
            return state
                .time_left()
                .map(EvalValue::Num)
                .unwrap_or(EvalValue::None)
        }
        "target_count" => return EvalValue::Num(state.config.target_count as f64),
        "score_total" => return EvalValue::Num(state.score_total),
        _ => {}
    }
    let parts: Vec<&str> = key.split('.').collect();
    match parts.as_slice() {
        ["resource", name] => resource_prop(state, name, "value"),
        ["resource", name, prop] => resource_prop(state, name, prop),
        ["buff", name] => effect_prop(state, name, EffectKind::Buff, "remains"),
        ["buff", name, prop] => effect_prop(state, name, EffectKind::Buff, prop),
        ["debuff", name] => effect_prop(state, name, EffectKind::Debuff, "remains"),
        ["debuff", name, prop] => effect_prop(state, name, EffectKind::Debuff, prop),
        ["dot", name] => effect_prop(state, name, EffectKind::Dot, "remains"),
        ["dot", name, prop] => effect_prop(state, name, EffectKind::Dot, prop),
        ["cooldown", name] => cooldown_prop(state, name, "remains"),
        ["cooldown", name, prop] => cooldown_prop(state, name, prop),
        ["charges", name] => charges_prop(state, name, "count"),
        ["charges", name, prop] => charges_prop(state, name, prop),
        ["stacks", name] => match state.catalog.effect_by_name(name) {
            Some(id) => EvalValue::Num(state.stack_count(id) as f64),
            None => EvalValue::None,
        },
        ["prev", back] => match back.parse::<usize>() {
            Ok(back) => state
                .prev(back)
                .and_then(|id| state.catalog.ability(id))
                .map(|def| EvalValue::Str(normalize(&def.name)))
                .unwrap_or(EvalValue::None),
            Err(_) => EvalValue::None,
        },
        ["cfg", flag] => EvalValue::Bool(state.config.flag(flag)),
        // Bare unknown idents evaluate to their own name, so comparisons
        // against ability names (`prev.1 = strike`) need no quoting.
        _ => EvalValue::Str(key.clone()),
    }
}

fn resource_prop(state: &SimState, name: &str, prop: &str) -> EvalValue {
    let Some(id) = state.catalog.resource_by_name(name) else {
        return EvalValue::None;
    };
    let def = &state.catalog.resources[id.index()];
    let value = state.resource(id);
    match prop {
        "value" => EvalValue::Num(value),
        "max" => EvalValue::Num(def.cap),
        "deficit" => EvalValue::Num((def.cap - value).max(0.0)),
        "pct" => {
            if def.cap > 0.0 {
                EvalValue::Num(value / def.cap * 100.0)
            } else {
                EvalValue::Num(0.0)
            }
        }
        _ => EvalValue::None,
    }
}

fn effect_prop(state: &SimState, name: &str, kind: EffectKind, prop: &str) -> EvalValue {
    let Some(id) = state.catalog.effect_by_name(name) else {
        return EvalValue::None;
    };
    let def = &state.catalog.effects[id.index()];
    if def.kind != kind {
        return EvalValue::None;
    }
    let remaining = state.remaining(id);
    match prop {
        "remains" => EvalValue::Num(remaining),
        "up" | "ticking" => EvalValue::Bool(remaining > 0.0),
        "down" => EvalValue::Bool(remaining <= 0.0),
        "stack" | "stacks" => EvalValue::Num(state.stack_count(id) as f64),
        _ => EvalValue::None,
    }
}

fn cooldown_prop(state: &SimState, name: &str, prop: &str) -> EvalValue {
    let Some(id) = state.catalog.ability_by_name(name) else {
        return EvalValue::None;
    };
    match prop {
        "remains" => EvalValue::Num(state.cooldown_remaining(id)),
        "ready" => EvalValue::Bool(state.cooldown_ready(id)),
        _ => EvalValue::None,
    }
}

fn charges_prop(state: &SimState, name: &str, prop: &str) -> EvalValue {
    let Some(id) = state.catalog.ability_by_name(name) else {
        return EvalValue::None;
    };
    match prop {
        "count" => EvalValue::Num(state.charge_count(id) as f64),
        "fractional" => EvalValue::Num(state.charges_fractional(id)),
        "full_recharge" => EvalValue::Num(state.full_recharge_time(id)),
        _ => EvalValue::None,
    }
}

fn eval_call(
    name: &str,
    args: &[Expr],
    state: &SimState,
    vars: &HashMap<String, f64>,
) -> EvalValue {
    match normalize(name).as_str() {
        "max" => {
            let values: Vec<f64> = args
                .iter()
                .filter_map(|expr| evaluate(expr, state, vars).as_number())
                .collect();
            values
                .into_iter()
                .reduce(f64::max)
                .map(EvalValue::Num)
                .unwrap_or(EvalValue::None)
        }
        "min" => {
            let values: Vec<f64> = args
                .iter()
                .filter_map(|expr| evaluate(expr, state, vars).as_number())
                .collect();
            values
                .into_iter()
                .reduce(f64::min)
                .map(EvalValue::Num)
                .unwrap_or(EvalValue::None)
        }
        "floor" => {
            if args.len() != 1 {
                return EvalValue::None;
            }
            evaluate(&args[0], state, vars)
                .as_number()
                .map(|v| EvalValue::Num(v.floor()))
                .unwrap_or(EvalValue::None)
        }
        "ceil" => {
            if args.len() != 1 {
                return EvalValue::None;
            }
            evaluate(&args[0], state, vars)
                .as_number()
                .map(|v| EvalValue::Num(v.ceil()))
                .unwrap_or(EvalValue::None)
        }
        _ => EvalValue::None,
    }
}

fn values_equal(left: &EvalValue, right: &EvalValue) -> bool {
    match (left, right) {
        (EvalValue::Bool(a), EvalValue::Bool(b)) => a == b,
        (EvalValue::Num(a), EvalValue::Num(b)) => a == b,
        (EvalValue::Str(a), EvalValue::Str(b)) => a == b,
        (EvalValue::None, _) | (_, EvalValue::None) => false,
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn compare_numbers<F>(left: &EvalValue, right: &EvalValue, cmp: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

fn combine_numbers<F>(left: &EvalValue, right: &EvalValue, op: F) -> EvalValue
where
    F: Fn(f64, f64) -> f64,
{
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => EvalValue::Num(op(a, b)),
        _ => EvalValue::None,
    }
}
