use std::num::NonZeroU32;

use strum::Display;
use strum::EnumIter;

use super::update::VisualUpdate;

/// Frequency readings below this are a grid-disconnect sentinel, not a real frequency.
pub const GRID_DISCONNECT_HZ: f64 = 10.0;

/// Logical sensor on the power-flow display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Load,
    Pv,
    Battery,
    BatterySoc,
    Grid,
    GridFrequency,
}

/// Numeric policy shared by all roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Wattage that renders as a full bar.
    pub max_watts: NonZeroU32,

    /// State of charge at or below which the battery is flagged `warning`.
    pub battery_warning_pct: i64,

    /// State of charge at or below which the battery is flagged `low`.
    pub battery_low_pct: i64,
}

type TranslateFn = fn(&str, &Limits) -> Option<Vec<VisualUpdate>>;

impl Role {
    /// Translate a raw state into display updates.
    ///
    /// Returns `None` when the raw value does not parse as the role's numeric type.
    pub fn translate(self, raw: &str, limits: &Limits) -> Option<Vec<VisualUpdate>> {
        (self.translator())(raw, limits)
    }

    fn translator(self) -> TranslateFn {
        match self {
            Role::Load => load,
            Role::Pv => pv,
            Role::Battery => battery,
            Role::BatterySoc => battery_soc,
            Role::Grid => grid,
            Role::GridFrequency => grid_frequency,
        }
    }
}

/// Format `watts` as a share of `max_watts`, with two decimals.
pub fn percentage(watts: i64, max_watts: NonZeroU32) -> String {
    let pct = watts as f64 / f64::from(max_watts.get()) * 100.0;
    format!("{pct:.2}")
}

/// Split watts into whole kilowatts and the next two decimal digits.
///
/// Both parts truncate toward zero.
pub fn kilowatt_parts(watts: i64) -> (i64, i64) {
    (watts / 1000, (watts % 1000) / 10)
}

fn load(raw: &str, limits: &Limits) -> Option<Vec<VisualUpdate>> {
    let watts: i64 = raw.parse().ok()?;
    let (kw, cw) = kilowatt_parts(watts);

    Some(vec![
        VisualUpdate::percentage("#load", percentage(watts, limits.max_watts)),
        VisualUpdate::text("#loadText .super", kw.to_string()),
        VisualUpdate::text("#loadText .sub", format!(".{cw}")),
    ])
}

fn pv(raw: &str, limits: &Limits) -> Option<Vec<VisualUpdate>> {
    bar("#pv", raw, limits)
}

fn battery(raw: &str, limits: &Limits) -> Option<Vec<VisualUpdate>> {
    bar("#battery", raw, limits)
}

fn grid(raw: &str, limits: &Limits) -> Option<Vec<VisualUpdate>> {
    bar("#grid", raw, limits)
}

fn bar(selector: &'static str, raw: &str, limits: &Limits) -> Option<Vec<VisualUpdate>> {
    let watts: i64 = raw.parse().ok()?;
    Some(vec![VisualUpdate::percentage(
        selector,
        percentage(watts, limits.max_watts),
    )])
}

/// Class for a state of charge, if any.
pub fn battery_class(soc: i64, limits: &Limits) -> Option<&'static str> {
    if soc <= limits.battery_low_pct {
        Some("low")
    } else if soc <= limits.battery_warning_pct {
        Some("warning")
    } else {
        None
    }
}

fn battery_soc(raw: &str, limits: &Limits) -> Option<Vec<VisualUpdate>> {
    let soc: i64 = raw.parse().ok()?;

    let mut updates = vec![
        VisualUpdate::percentage("#batterySoC", soc.to_string()),
        VisualUpdate::remove_class("#batterySoC", "low"),
        VisualUpdate::remove_class("#batterySoC", "warning"),
    ];
    if let Some(class) = battery_class(soc, limits) {
        updates.push(VisualUpdate::add_class("#batterySoC", class));
    }
    updates.push(VisualUpdate::text("#batterySoC .value", format!("{soc}%")));
    Some(updates)
}

/// Class for the grid-disconnect indicator; exactly one of `on` and `off`.
pub fn grid_disconnect_class(hz: f64) -> &'static str {
    if hz < GRID_DISCONNECT_HZ {
        "on"
    } else {
        "off"
    }
}

fn grid_frequency(raw: &str, _limits: &Limits) -> Option<Vec<VisualUpdate>> {
    let hz: f64 = raw.parse().ok()?;

    const INDICATOR: &str = "#icons #grid-disconnect";
    Some(vec![
        VisualUpdate::remove_class(INDICATOR, "on"),
        VisualUpdate::remove_class(INDICATOR, "off"),
        VisualUpdate::add_class(INDICATOR, grid_disconnect_class(hz)),
    ])
}
