//! Plan and value rendering for the terminal

use colored::{ColoredString, Colorize};

use fortios_core::Value;
use fortios_core::effect::Effect;
use fortios_core::plan::Plan;
use fortios_core::resource::Attributes;

pub fn print_plan(plan: &Plan) {
    if plan.is_empty() {
        println!("{}", "No changes. Device configuration is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for effect in plan.effects() {
        print_effect(effect);
    }

    let summary = plan.summary();
    let resets = if summary.reset > 0 {
        format!("{} to reset, ", summary.reset.to_string().magenta())
    } else {
        String::new()
    };
    println!(
        "Plan: {} to add, {} to change, {}{} to destroy.",
        summary.create.to_string().green(),
        summary.update.to_string().yellow(),
        resets,
        summary.delete.to_string().red()
    );
}

fn symbol(effect: &Effect) -> ColoredString {
    match effect {
        Effect::Create(_) => "+".green().bold(),
        Effect::Update { .. } => "~".yellow().bold(),
        Effect::Reset(_) => "0".magenta().bold(),
        Effect::Delete(_) => "-".red().bold(),
        Effect::Read(_) => "<=".cyan().bold(),
    }
}

fn print_effect(effect: &Effect) {
    let id = effect.resource_id();
    println!(
        "  {} {}.{}",
        symbol(effect),
        id.resource_type.cyan().bold(),
        id.name.bold()
    );

    match effect {
        Effect::Create(r) => {
            for key in sorted_keys(&r.attributes) {
                println!("      {}: {}", key, format_value(&r.attributes[key]).green());
            }
        }
        Effect::Update {
            from,
            to,
            changed_attributes,
            ..
        } => {
            for key in changed_attributes {
                let old = from
                    .attributes
                    .get(key)
                    .map(format_value)
                    .unwrap_or_else(|| "(none)".to_string());
                let new = to
                    .attributes
                    .get(key)
                    .map(format_value)
                    .unwrap_or_else(|| "(cleared)".to_string());
                println!("      {}: {} → {}", key, old.red(), new.green());
            }
        }
        Effect::Reset(_) => {
            println!("      {}", "all settings return to device defaults".magenta());
        }
        Effect::Delete(state) => {
            if let Some(identifier) = &state.identifier {
                println!("      {}: {}", "mkey".bold(), identifier.red());
            }
        }
        Effect::Read(_) => {}
    }
    println!();
}

/// Attribute names with the identity-like `name` first
fn sorted_keys(attributes: &Attributes) -> Vec<&String> {
    let mut keys: Vec<_> = attributes.keys().collect();
    keys.sort_by(|a, b| match (a.as_str(), b.as_str()) {
        ("name", _) => std::cmp::Ordering::Less,
        (_, "name") => std::cmp::Ordering::Greater,
        _ => a.cmp(b),
    });
    keys
}

pub fn format_effect(effect: &Effect) -> String {
    match effect {
        Effect::Create(r) => format!("Create {}", r.id),
        Effect::Update { id, .. } => format!("Update {}", id),
        Effect::Reset(state) => format!("Reset {}", state.id),
        Effect::Delete(state) => format!("Delete {}", state.id),
        Effect::Read(r) => format!("Read {}", r.id),
    }
}

pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Block(fields) => {
            let mut strs: Vec<_> = fields
                .iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            strs.sort();
            format!("{{{}}}", strs.join(", "))
        }
    }
}
