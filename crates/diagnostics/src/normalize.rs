//! Appliance tag set and synonym lexicon.

/// Canonical appliance tags.  Collaborators only ever see these (or a
/// lowercased pass-through for terms outside the lexicon).
pub mod appliance {
    pub const WASHER: &str = "washer";
    pub const DRYER: &str = "dryer";
    pub const REFRIGERATOR: &str = "refrigerator";
    pub const DISHWASHER: &str = "dishwasher";
    pub const OVEN: &str = "oven";
    pub const MICROWAVE: &str = "microwave";
    pub const HVAC: &str = "hvac";
    pub const GARBAGE_DISPOSAL: &str = "garbage_disposal";
    pub const WATER_HEATER: &str = "water_heater";
    pub const FREEZER: &str = "freezer";

    pub const ALL: [&str; 10] = [
        WASHER,
        DRYER,
        REFRIGERATOR,
        DISHWASHER,
        OVEN,
        MICROWAVE,
        HVAC,
        GARBAGE_DISPOSAL,
        WATER_HEATER,
        FREEZER,
    ];
}

/// Normalize caller wording to a canonical appliance tag.
///
/// Handles the common variations and misspellings heard on calls; returns
/// `None` for terms outside the lexicon.
pub fn normalize_appliance(raw: &str) -> Option<&'static str> {
    use appliance::*;

    let term = raw.trim().to_lowercase();
    let tag = match term.as_str() {
        // Washer variations
        "washer" | "washing machine" | "clothes washer" | "laundry machine" => WASHER,

        // Dryer variations
        "dryer" | "clothes dryer" | "tumble dryer" => DRYER,

        // Refrigerator variations ("refridgerator" is a common misspelling)
        "refrigerator" | "fridge" | "refridgerator" => REFRIGERATOR,

        // Dishwasher variations
        "dishwasher" | "dish washer" => DISHWASHER,

        // Oven variations
        "oven" | "stove" | "range" | "cooktop" => OVEN,

        // Microwave variations
        "microwave" | "micro wave" => MICROWAVE,

        // HVAC variations
        "hvac" | "ac" | "air conditioner" | "air conditioning" | "heat pump" | "furnace"
        | "heating" | "central air" => HVAC,

        // Others
        "garbage disposal" | "disposal" => GARBAGE_DISPOSAL,
        "water heater" | "hot water heater" => WATER_HEATER,
        "freezer" => FREEZER,

        _ => return None,
    };
    Some(tag)
}
