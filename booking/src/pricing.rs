//! Pricing engine.
//!
//! Pricing is best-effort: answers that do not match anything add nothing
//! and never fail. All arithmetic is fixed-point [`Money`].

use crate::answers;
use autoshop_core::appointment::Answers;
use autoshop_core::catalog::{RequirementType, Service, ServiceRequirement};
use autoshop_core::money::{Money, Quantity};
use autoshop_core::pricing::{Addon, PriceQuote};
use serde_json::Value;

/// Prices one service for the given answers.
///
/// `requirements` are the service's requirements in display order; addons
/// come out in the same order.
#[must_use]
pub fn price(service: &Service, requirements: &[ServiceRequirement], answers: &Answers) -> PriceQuote {
    let mut addons = Vec::new();
    for requirement in requirements {
        if let Some(value) = answers.get(requirement.key.as_str()) {
            addons_for(service, requirement, value, &mut addons);
        }
    }
    PriceQuote::new(
        service.base_price.unwrap_or(Money::ZERO),
        addons,
        service.base_price.is_none(),
    )
}

fn addons_for(service: &Service, requirement: &ServiceRequirement, value: &Value, out: &mut Vec<Addon>) {
    let mut push = |label: String, amount: Money| {
        if !amount.is_zero() {
            out.push(Addon {
                service_id: service.id,
                requirement: requirement.key.clone(),
                label,
                amount,
            });
        }
    };

    match &requirement.kind {
        RequirementType::Select { options } | RequirementType::Radio { options } => {
            let Some(answer) = answers::as_text(value) else {
                return;
            };
            if let Some(option) = options.iter().find(|o| o.value == answer.as_ref()) {
                push(format!("{}: {}", requirement.label, option.label), option.price);
            }
        }
        RequirementType::Multiselect { options } => {
            let Value::Array(items) = value else {
                return;
            };
            let chosen: Vec<_> = items.iter().filter_map(answers::as_text).collect();
            for option in options.iter().filter(|o| chosen.iter().any(|c| c.as_ref() == o.value)) {
                push(format!("{}: {}", requirement.label, option.label), option.price);
            }
        }
        RequirementType::Checkbox { price } | RequirementType::Toggle { price } => {
            if answers::is_truthy(value) {
                push(requirement.label.clone(), *price);
            }
        }
        RequirementType::Number {
            unit_price: Some(unit_price),
            ..
        } => {
            let Ok(quantity) = Quantity::from_json(value) else {
                return;
            };
            if let Some(amount) = unit_price.checked_times(quantity) {
                push(format!("{} × {quantity}", requirement.label), amount);
            }
        }
        RequirementType::Number { unit_price: None, .. }
        | RequirementType::Text
        | RequirementType::Textarea
        | RequirementType::Date { .. } => {}
    }
}
