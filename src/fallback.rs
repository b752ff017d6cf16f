//! Deterministic, network-free substitute payloads.
//!
//! Used by the orchestrator when the model's answer cannot be coerced into the expected
//! schema. Output always satisfies the same invariants as a parsed model response.
//! Node-insight templates quote the caller's own parameter values when they are present.

use crate::schemas::{
    NodeInsight, ParamValue, ProcessParameters, RecommendationReport, RequestKind, SuggestionSet,
};
use crate::stages::Stage;

// Both lists are matched against whole words of the energy-source text.
const FOSSIL_MARKERS: &[&str] = &[
    "coal",
    "lignite",
    "gas",
    "oil",
    "diesel",
    "petrol",
    "petroleum",
    "fossil",
    "coke",
    "peat",
    "lng",
    "lpg",
];
const LOW_CARBON_MARKERS: &[&str] = &[
    "solar",
    "photovoltaic",
    "pv",
    "wind",
    "hydro",
    "hydropower",
    "hydroelectric",
    "hydroelectricity",
    "renewable",
    "renewables",
    "geothermal",
    "nuclear",
    "biomass",
    "biogas",
    "biofuel",
    "biofuels",
    "biodiesel",
    "biomethane",
    "green hydrogen",
];

/// A payload shape the synthesizer can produce, tied to the request kind that returns it.
pub trait Synthesized: Sized {
    const KIND: RequestKind;

    fn synthesize(params: &ProcessParameters, stage: Option<&Stage>) -> Self;
}

impl Synthesized for SuggestionSet {
    const KIND: RequestKind = RequestKind::SuggestMissingParameters;

    fn synthesize(_params: &ProcessParameters, _stage: Option<&Stage>) -> Self {
        suggestions()
    }
}

impl Synthesized for RecommendationReport {
    const KIND: RequestKind = RequestKind::GenerateReport;

    fn synthesize(params: &ProcessParameters, _stage: Option<&Stage>) -> Self {
        report(params)
    }
}

impl Synthesized for NodeInsight {
    const KIND: RequestKind = RequestKind::GenerateNodeInsight;

    fn synthesize(params: &ProcessParameters, stage: Option<&Stage>) -> Self {
        match stage {
            Some(stage) => node_insight(stage, params),
            None => node_insight(&Stage::Other(String::new()), params),
        }
    }
}

/// Schema-valid substitute for the kind `T` answers. `stage` is only consulted for node insights.
pub fn synthesize<T: Synthesized>(params: &ProcessParameters, stage: Option<&Stage>) -> T {
    T::synthesize(params, stage)
}

/// Static table of plausible defaults. Independent of the input.
pub fn suggestions() -> SuggestionSet {
    let mut s = SuggestionSet::new();
    s.insert("energySource".into(), ParamValue::from("Grid electricity (regional mix)"));
    s.insert("recyclingRate".into(), ParamValue::from(30_i64));
    s.insert("transportMode".into(), ParamValue::from("Rail"));
    s.insert("transportDistance".into(), ParamValue::from(500_i64));
    s.insert("productLifetime".into(), ParamValue::from(20_i64));
    s.insert("materialEfficiency".into(), ParamValue::from(85_i64));
    s.insert("endOfLifeTreatment".into(), ParamValue::from("Recycling"));
    s.insert("waterConsumptionMining".into(), ParamValue::from(50_i64));
    s
}

pub fn report(params: &ProcessParameters) -> RecommendationReport {
    let metal = params
        .text("metalType")
        .unwrap_or_else(|| "the assessed metal".to_string());
    let summary = format!(
        "Life cycle assessment of {metal} production based on {n} supplied process parameters. \
         Detailed AI analysis was not available, so this summary reflects standard industry \
         guidance: for {metal}, the largest environmental burdens typically arise from \
         energy-intensive extraction and processing, while higher recycled content and \
         end-of-life recovery offer the greatest circularity gains.",
        n = params.len(),
    );
    RecommendationReport {
        summary,
        recommendations: vec![
            "Shift processing energy to renewable electricity sources to cut greenhouse gas emissions.".to_string(),
            "Increase the share of recycled feedstock to reduce demand for primary ore extraction.".to_string(),
            "Recover and valorise by-products such as slag and waste heat from processing.".to_string(),
            "Optimise logistics by favouring rail or sea freight and consolidating shipments.".to_string(),
            "Design products for disassembly and set up take-back schemes to raise end-of-life recovery rates.".to_string(),
        ],
    }
}

pub fn node_insight(stage: &Stage, params: &ProcessParameters) -> NodeInsight {
    match stage {
        Stage::RawMaterial => raw_material(params),
        Stage::Processing => processing(params),
        Stage::Manufacturing => manufacturing(params),
        Stage::Distribution => distribution(params),
        Stage::Use => use_phase(params),
        Stage::EndOfLife => end_of_life(params),
        Stage::Other(label) => generic(label),
    }
}

fn raw_material(p: &ProcessParameters) -> NodeInsight {
    let mut circular = Vec::new();
    match (p.text("oreGrade"), p.number("oreGrade")) {
        (Some(text), Some(grade)) if grade < 1.0 => circular.push(format!(
            "With an ore grade of {text}%, every tonne of metal requires moving large volumes of rock, \
             so reprocessing tailings and substituting secondary feedstock can displace a meaningful share of primary extraction."
        )),
        (Some(text), _) => circular.push(format!(
            "An ore grade of {text}% is comparatively favourable; prioritising tailings reprocessing and \
             by-product recovery keeps more of the extracted value in the loop."
        )),
        (None, _) => circular.push(
            "Substituting primary ore with recycled feedstock and reprocessing mine tailings are the main \
             circular levers at the extraction stage."
                .to_string(),
        ),
    }
    match p.text("landUse") {
        Some(land) => circular.push(format!(
            "The {land} of disturbed land should be rehabilitated progressively so it can return to productive use."
        )),
        None => circular.push(
            "Progressive rehabilitation of disturbed land allows the site to return to productive use."
                .to_string(),
        ),
    }

    let mut impacts = Vec::new();
    let location = p
        .text("miningLocation")
        .map(|l| format!(" in {l}"))
        .unwrap_or_default();
    if let Some(energy) = p.text("energyConsumptionMining") {
        impacts.push(format!(
            "Extraction{location} consumes {energy} units of energy per unit of output, which drives most of this stage's carbon footprint."
        ));
    }
    if let Some(water) = p.text("waterConsumptionMining") {
        impacts.push(format!(
            "Water consumption of {water} places pressure on local watersheds and should be reduced through recycling of process water."
        ));
    }
    if impacts.is_empty() {
        impacts.push(format!(
            "Mining{location} typically dominates land disturbance and can be a major source of energy use, \
             water consumption and habitat loss."
        ));
        impacts.push(
            "Measuring energy and water use per tonne of ore is the first step toward reducing these impacts."
                .to_string(),
        );
    }

    insight(circular, impacts)
}

fn processing(p: &ProcessParameters) -> NodeInsight {
    let mut circular = Vec::new();
    match p.text("processingMethod") {
        Some(method) => circular.push(format!(
            "{method} generates slag, off-gases and waste heat that can be valorised, with slag used as \
             construction aggregate and recovered heat used for preheating or district heating."
        )),
        None => circular.push(
            "Processing residues such as slag and waste heat can be valorised as construction aggregate \
             and recovered energy."
                .to_string(),
        ),
    }
    circular.push(
        "Blending scrap into the furnace charge lowers both ore demand and energy use per tonne."
            .to_string(),
    );

    let mut impacts = Vec::new();
    match p.text("energySource") {
        Some(source) => {
            if mentions_any(&source, LOW_CARBON_MARKERS) {
                impacts.push(format!(
                    "Processing powered by {source} already avoids most combustion emissions, leaving process \
                     emissions and reagent use as the main remaining impacts."
                ));
            } else if mentions_any(&source, FOSSIL_MARKERS) {
                impacts.push(format!(
                    "Relying on {source} for processing energy makes this stage a major source of greenhouse gas emissions, \
                     so transitioning away from {source} toward renewable electricity is the largest single lever for cutting the footprint."
                ));
            } else {
                impacts.push(format!(
                    "The carbon intensity of the {source} energy supply determines most of this stage's \
                     emissions and should be verified against renewable alternatives."
                ));
            }
        }
        None => impacts.push(
            "Smelting and refining are energy-intensive, so the carbon intensity of the energy supply \
             largely determines this stage's emissions."
                .to_string(),
        ),
    }
    if let Some(emissions) = p.text("emissionsProcessing") {
        impacts.push(format!(
            "Reported process emissions of {emissions} should be tracked per tonne of output to measure progress."
        ));
    } else if let Some(energy) = p.text("energyConsumptionProcessing") {
        impacts.push(format!(
            "An energy demand of {energy} units makes efficiency upgrades such as heat recovery worthwhile."
        ));
    }

    insight(circular, impacts)
}

fn manufacturing(p: &ProcessParameters) -> NodeInsight {
    let mut circular = Vec::new();
    match (p.text("materialEfficiency"), p.number("materialEfficiency")) {
        (Some(text), Some(eff)) if eff < 90.0 => {
            let lost = format_percent(100.0 - eff);
            circular.push(format!(
                "A material efficiency of {text}% means roughly {lost}% of input becomes offcuts or scrap, \
                 which should be segregated and returned directly to remelting."
            ));
        }
        (Some(text), _) => circular.push(format!(
            "At {text}% material efficiency, the remaining offcuts are best kept clean and alloy-sorted \
             so they can be remelted without downgrading."
        )),
        (None, _) => circular.push(
            "Closed-loop recovery of production scrap and offcuts is the main circular lever in manufacturing."
                .to_string(),
        ),
    }
    if let Some(process) = p.text("manufacturingProcess") {
        circular.push(format!(
            "Reviewing the {process} process for near-net-shape techniques can reduce scrap at the source."
        ));
    }

    let mut impacts = Vec::new();
    if let Some(energy) = p.text("energyConsumptionManufacturing") {
        impacts.push(format!(
            "Manufacturing consumes {energy} units of energy, so efficient equipment and renewable supply directly reduce emissions."
        ));
    }
    if let Some(waste) = p.text("wasteGenerated") {
        impacts.push(format!(
            "The {waste} of waste generated should be characterised so hazardous fractions are treated and the rest recovered."
        ));
    }
    if impacts.is_empty() {
        impacts.push(
            "Manufacturing impacts come mainly from energy use and from material lost as scrap."
                .to_string(),
        );
        impacts.push(
            "Tracking both per unit of product makes improvements measurable.".to_string(),
        );
    }

    insight(circular, impacts)
}

fn distribution(p: &ProcessParameters) -> NodeInsight {
    let mut circular = Vec::new();
    match p.text("packagingType") {
        Some(packaging) => circular.push(format!(
            "Replacing single-use {packaging} with returnable, reusable packaging keeps packaging materials in circulation."
        )),
        None => circular.push(
            "Returnable, reusable packaging and consolidated loads keep distribution materials in circulation."
                .to_string(),
        ),
    }
    circular.push(
        "Backhauling scrap on return trips turns empty runs into reverse logistics for recycling."
            .to_string(),
    );

    let mut impacts = Vec::new();
    let mode = p.text("transportMode");
    let distance = p.text("transportDistance");
    match (&mode, &distance) {
        (Some(mode), Some(distance)) => {
            impacts.push(format!(
                "Moving material {distance} km by {mode} determines most of this stage's fuel use and emissions."
            ));
            let road = ["truck", "road", "lorry"]
                .iter()
                .any(|m| mode.to_lowercase().contains(m));
            if road && p.number("transportDistance").is_some_and(|d| d > 500.0) {
                impacts.push(
                    "Over this distance, shifting freight from road to rail or ship would cut emissions substantially."
                        .to_string(),
                );
            }
        }
        (Some(mode), None) => impacts.push(format!(
            "Transport by {mode} determines most of this stage's fuel use and emissions."
        )),
        (None, Some(distance)) => impacts.push(format!(
            "A transport distance of {distance} km makes mode choice and load factor the key drivers of emissions."
        )),
        (None, None) => {
            impacts.push(
                "Distribution impacts depend mainly on transport mode, distance and load factor."
                    .to_string(),
            );
            impacts.push(
                "Rail and sea freight generally emit far less per tonne-kilometre than road transport."
                    .to_string(),
            );
        }
    }
    if let Some(fuel) = p.text("fuelType") {
        impacts.push(format!(
            "Switching from {fuel} to lower-carbon fuels or electrified transport would reduce these emissions further."
        ));
    }

    insight(circular, impacts)
}

fn use_phase(p: &ProcessParameters) -> NodeInsight {
    let mut circular = Vec::new();
    match p.text("productLifetime") {
        Some(lifetime) => circular.push(format!(
            "A product lifetime of {lifetime} years can be extended further through design for repair, \
             refurbishment and modular upgrades."
        )),
        None => circular.push(
            "Extending product lifetime through design for repair and refurbishment is the main circular lever in use."
                .to_string(),
        ),
    }
    if let Some(maintenance) = p.text("maintenanceFrequency") {
        circular.push(format!(
            "Maintenance at a frequency of {maintenance} is an opportunity to recover worn parts for remanufacturing."
        ));
    }

    let mut impacts = Vec::new();
    match p.text("usePhaseEnergy") {
        Some(energy) => impacts.push(format!(
            "Use-phase energy of {energy} units accumulates over the whole lifetime, so efficiency improvements compound."
        )),
        None => impacts.push(
            "Use-phase impacts are usually driven by energy consumed over the product's lifetime."
                .to_string(),
        ),
    }
    impacts.push(
        "Metal products themselves are largely inert in use, so durability and efficiency dominate this stage."
            .to_string(),
    );

    insight(circular, impacts)
}

fn end_of_life(p: &ProcessParameters) -> NodeInsight {
    let mut circular = Vec::new();
    match (p.text("recyclingRate"), p.number("recyclingRate")) {
        (Some(text), Some(rate)) if rate < 50.0 => circular.push(format!(
            "A recycling rate of {text}% leaves most material unrecovered, so better collection, sorting \
             and take-back schemes offer a large circularity gain."
        )),
        (Some(text), _) => circular.push(format!(
            "A recycling rate of {text}% is strong; keeping scrap streams clean and alloy-separated preserves \
             quality for closed-loop recycling."
        )),
        (None, _) => circular.push(
            "Metals can be recycled repeatedly without loss of properties, so collection and sorting are the key levers."
                .to_string(),
        ),
    }
    if let Some(recovery) = p.text("recoveryEfficiency") {
        circular.push(format!(
            "Raising recovery efficiency beyond {recovery}% would return more metal to production."
        ));
    }

    let mut impacts = Vec::new();
    match p.text("endOfLifeTreatment") {
        Some(treatment) => impacts.push(format!(
            "The current end-of-life route ({treatment}) determines how much material is lost to landfill or dissipation."
        )),
        None => impacts.push(
            "Material that is landfilled or dissipated at end of life is lost to the economy and must be replaced by primary production."
                .to_string(),
        ),
    }
    if let Some(quality) = p.text("scrapQuality") {
        impacts.push(format!(
            "Scrap of {quality} quality affects how much energy is needed to refine it back to usable metal."
        ));
    } else {
        impacts.push(
            "Recycled metal typically needs a fraction of the energy of primary production.".to_string(),
        );
    }

    insight(circular, impacts)
}

/// Whether `text` contains any marker as a run of whole words, ignoring case.
fn mentions_any(text: &str, markers: &[&str]) -> bool {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    markers.iter().any(|marker| {
        let wanted: Vec<&str> = marker.split_whitespace().collect();
        words
            .windows(wanted.len())
            .any(|window| window.iter().zip(&wanted).all(|(word, want)| word == want))
    })
}

fn generic(label: &str) -> NodeInsight {
    let stage = if label.trim().is_empty() {
        "this".to_string()
    } else {
        format!("the {}", label.trim())
    };
    NodeInsight {
        circular_opportunities: format!(
            "At {stage} stage, look for opportunities to reuse materials, recover by-products and design for recyclability. \
             Sharing material-flow data with upstream and downstream partners helps close the loop."
        ),
        environmental_impacts: format!(
            "{} stage contributes to the overall footprint through its energy and material use. \
             Measuring energy, water and waste at this stage makes its impacts visible and manageable.",
            capitalize(&stage)
        ),
    }
}

fn insight(circular: Vec<String>, impacts: Vec<String>) -> NodeInsight {
    NodeInsight {
        circular_opportunities: circular.join(" "),
        environmental_impacts: impacts.join(" "),
    }
}

fn format_percent(v: f64) -> String {
    let rounded = (v * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        format!("{:.1}", rounded)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
