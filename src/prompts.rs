//! Prompt construction for each request kind.
//!
//! Every prompt embeds the relevant parameters as a pretty JSON dump and ends with an
//! explicit output-schema instruction. Building a prompt never fails.

use crate::schemas::{CANDIDATE_PARAMETERS, ProcessParameters, RequestKind};
use crate::stages::Stage;

const ROLE_PREAMBLE: &str = "You are an expert in life cycle assessment (LCA) and the circular economy for metals and metallurgical processes.";

const JSON_ONLY: &str = "Respond with ONLY the JSON object. No markdown, no code fences, no commentary before or after it.";

/// Build the prompt for `kind`. `stage` is only consulted for node insights.
pub fn build(kind: RequestKind, params: &ProcessParameters, stage: Option<&Stage>) -> String {
    match kind {
        RequestKind::SuggestMissingParameters => suggest_parameters_prompt(params),
        RequestKind::GenerateReport => report_prompt(params),
        RequestKind::GenerateNodeInsight => {
            let fallback_stage = Stage::Other(String::new());
            node_insight_prompt(stage.unwrap_or(&fallback_stage), params)
        }
    }
}

pub fn suggest_parameters_prompt(params: &ProcessParameters) -> String {
    let candidates = CANDIDATE_PARAMETERS
        .iter()
        .map(|name| format!("- {}", name))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{ROLE_PREAMBLE}\n\n\
         A user is modelling a metal production process and has supplied these parameters:\n\
         {dump}\n\n\
         Identify which important parameters are missing and suggest realistic values for them, \
         based on typical industry data for the given metal and process.\n\
         Only propose parameters from this list:\n{candidates}\n\n\
         Output schema: a single JSON object whose keys are parameter names from the list above \
         and whose values are the suggested numeric or text values, for example \
         {{\"recyclingRate\": 35, \"transportMode\": \"Rail\"}}.\n\
         If nothing important is missing, return the empty object {{}}.\n\
         {JSON_ONLY}",
        dump = params.to_pretty_json(),
    )
}

pub fn report_prompt(params: &ProcessParameters) -> String {
    format!(
        "{ROLE_PREAMBLE}\n\n\
         Analyse the following process parameters and write a sustainability assessment:\n\
         {dump}\n\n\
         Cover the main environmental hotspots (energy, emissions, water, land use) and \
         the circularity of the material flow.\n\n\
         Output schema: a JSON object with exactly two keys:\n\
         - \"summary\": a concise narrative summary of the life cycle assessment (string)\n\
         - \"recommendations\": an ordered list of specific, actionable recommendations (array of strings), most impactful first\n\
         {JSON_ONLY}",
        dump = params.to_pretty_json(),
    )
}

pub fn node_insight_prompt(stage: &Stage, params: &ProcessParameters) -> String {
    let relevant = match stage.relevant_keys() {
        Some(keys) => params.narrowed(keys),
        None => params.clone(),
    };
    let stage_label = if stage.label().is_empty() {
        "Unspecified stage"
    } else {
        stage.label()
    };
    format!(
        "{ROLE_PREAMBLE}\n\n\
         Focus on the \"{stage_label}\" stage of the life cycle. The parameters relevant to this stage are:\n\
         {dump}\n\n\
         Be specific and grounded in the data: reference the actual numeric values and named \
         inputs above (for example the exact percentages, distances or energy sources) rather than \
         giving generic advice.\n\n\
         Output schema: a JSON object with exactly two keys:\n\
         - \"circularOpportunities\": 2-3 sentences on circular economy opportunities at this stage (string)\n\
         - \"environmentalImpacts\": 2-3 sentences on the key environmental impacts at this stage (string)\n\
         {JSON_ONLY}",
        dump = relevant.to_pretty_json(),
    )
}
