use anyhow::Context;
use colored::Colorize;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Map, Value};

use soulfuse_fusion::{EnumeratorConfig, FusionDistribution, FusionEnumerator};
use soulfuse_rules::{RuleTable, SlotPolicy};
use soulfuse_select::SelectionAggregator;
use soulfuse_types::{Entity, SlotSchema};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let json = matches!(cli.format, OutputFormat::Json);
    match cli.command {
        Command::Fuse(args) => cmd_fuse(args, json),
        Command::Marginals(args) => cmd_marginals(args, json),
        Command::Random(args) => cmd_random(args, json),
        Command::Check(args) => cmd_check(args, json),
        Command::Slots(args) => cmd_slots(args, json),
    }
}

fn load_rules(args: &RulesArgs) -> anyhow::Result<RuleTable> {
    RuleTable::load(&args.rules)
        .with_context(|| format!("invalid rule table {}", args.rules.display()))
}

fn parse_parent(schema: &SlotSchema, side: &str, text: Option<&str>) -> anyhow::Result<Option<Entity>> {
    text.map(|t| Entity::parse(schema, t).with_context(|| format!("invalid {side} parent '{t}'")))
        .transpose()
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn percent(probability: f64) -> String {
    format!("{:.4}%", (probability * 100.0).abs())
}

fn cmd_fuse(args: FuseArgs, json: bool) -> anyhow::Result<()> {
    let table = load_rules(&args.rules)?;
    let schema = table.schema();
    let left = parse_parent(schema, "left", args.left.as_deref())?;
    let right = parse_parent(schema, "right", args.right.as_deref())?;

    let enumerator = FusionEnumerator::with_config(&table, EnumeratorConfig::pruned(args.epsilon))?;
    let distribution = enumerator.enumerate(left.as_ref(), right.as_ref())?;

    let mut selection = SelectionAggregator::new(distribution);
    for &index in &args.select {
        selection.toggle(index)?;
    }

    if json {
        return print_json(&fuse_report(schema, &selection, args.limit));
    }

    let distribution = selection.distribution();
    if distribution.is_empty() {
        println!("{}", "Choose both parents to preview a fusion.".dimmed());
    } else {
        let shown = args.limit.unwrap_or(usize::MAX).min(distribution.len());
        for (index, result) in distribution.iter().enumerate().take(shown) {
            let marker = if selection.is_selected(index) { "●".green() } else { "○".dimmed() };
            println!(
                "{} {:>6}  {:>9}  {}",
                marker,
                format!("#{index}").yellow(),
                percent(result.probability),
                result.entity.display(schema)
            );
        }
        if shown < distribution.len() {
            println!("  {} more", (distribution.len() - shown).to_string().bold());
        }
        if distribution.pruned_mass() > 0.0 {
            println!("Pruned: {}", percent(distribution.pruned_mass()).dimmed());
        }
    }
    println!("Combined probability of selected items: {}", selection.formatted().bold());
    Ok(())
}

fn cmd_marginals(args: MarginalsArgs, json: bool) -> anyhow::Result<()> {
    let table = load_rules(&args.rules)?;
    let schema = table.schema();
    let left = Entity::parse(schema, &args.left).context("invalid left parent")?;
    let right = Entity::parse(schema, &args.right).context("invalid right parent")?;
    let distribution = FusionEnumerator::new(&table).fuse(&left, &right)?;

    if json {
        return print_json(&marginals_report(schema, &distribution));
    }

    for (slot, attribute) in schema.iter() {
        println!("{}", attribute.name.bold());
        for (value, probability) in distribution.marginal(slot) {
            println!(
                "  {:>9}  {}",
                percent(probability),
                attribute.value_name(value).unwrap_or("?").cyan()
            );
        }
    }
    Ok(())
}

fn cmd_random(args: RandomArgs, json: bool) -> anyhow::Result<()> {
    let table = load_rules(&args.rules)?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let souls: Vec<String> = (0..args.count)
        .map(|_| Entity::random(table.schema(), &mut rng).display(table.schema()).to_string())
        .collect();

    if json {
        return print_json(&json!(souls));
    }
    for soul in souls {
        println!("{soul}");
    }
    Ok(())
}

fn cmd_check(args: CheckArgs, json: bool) -> anyhow::Result<()> {
    let table = load_rules(&args.rules)?;

    if json {
        return print_json(&check_report(&table));
    }

    let schema = table.schema();
    println!("{} Rule table {} is valid", "✓".green().bold(), args.rules.rules.display().to_string().bold());
    println!("  Slots: {}", schema.len());
    println!("  Distinct souls: {}", schema.entity_space());
    for (_, slot, rule) in table.slot_rules() {
        println!(
            "  {} {} values, {}, {} explicit rules{}",
            format!("{}:", slot.name).cyan(),
            slot.len(),
            describe_policy(rule.policy()),
            rule.explicit_rules(),
            if rule.is_symmetric() { "" } else { ", asymmetric" }
        );
    }
    Ok(())
}

fn cmd_slots(args: SlotsArgs, json: bool) -> anyhow::Result<()> {
    let table = load_rules(&args.rules)?;

    if json {
        return print_json(&serde_json::to_value(table.schema())?);
    }
    for (_, slot) in table.schema().iter() {
        println!("{} {}", format!("{}:", slot.name).cyan().bold(), slot.values.join(", "));
    }
    Ok(())
}

fn describe_policy(policy: SlotPolicy) -> String {
    match policy {
        SlotPolicy::Explicit => "explicit".into(),
        SlotPolicy::Inherit { left_weight } => format!("inherit (left {left_weight})"),
    }
}

fn soul_json(schema: &SlotSchema, entity: &Entity) -> Value {
    let map: Map<String, Value> = entity
        .named(schema)
        .into_iter()
        .map(|(slot, value)| (slot.to_string(), Value::from(value)))
        .collect();
    Value::Object(map)
}

fn fuse_report(schema: &SlotSchema, selection: &SelectionAggregator, limit: Option<usize>) -> Value {
    let distribution = selection.distribution();
    let results: Vec<Value> = distribution
        .iter()
        .enumerate()
        .take(limit.unwrap_or(usize::MAX))
        .map(|(index, result)| {
            json!({
                "index": index,
                "probability": result.probability,
                "selected": selection.is_selected(index),
                "soul": soul_json(schema, &result.entity),
            })
        })
        .collect();

    json!({
        "total": distribution.len(),
        "results": results,
        "pruned_mass": distribution.pruned_mass(),
        "selected": selection.selected().collect::<Vec<_>>(),
        "selected_probability": selection.cumulative_probability(),
        "selected_display": selection.formatted(),
    })
}

fn marginals_report(schema: &SlotSchema, distribution: &FusionDistribution) -> Value {
    let map: Map<String, Value> = schema
        .iter()
        .map(|(slot, attribute)| {
            let values: Map<String, Value> = distribution
                .marginal(slot)
                .into_iter()
                .map(|(value, p)| {
                    (attribute.value_name(value).unwrap_or("?").to_string(), Value::from(p))
                })
                .collect();
            (attribute.name.clone(), Value::Object(values))
        })
        .collect();
    Value::Object(map)
}

fn check_report(table: &RuleTable) -> Value {
    let slots: Vec<Value> = table
        .slot_rules()
        .map(|(_, slot, rule)| {
            json!({
                "name": slot.name,
                "values": slot.len(),
                "policy": describe_policy(rule.policy()),
                "explicit_rules": rule.explicit_rules(),
                "symmetric": rule.is_symmetric(),
            })
        })
        .collect();
    json!({
        "valid": true,
        "entity_space": table.schema().entity_space().to_string(),
        "tolerance": table.tolerance(),
        "slots": slots,
    })
}
