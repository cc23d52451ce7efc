//! Filename-heuristic sample metadata.
//!
//! Acquisition files carry their experimental metadata in the file name
//! (cell type, stimulus, timepoint, replicate, ...), with several naming
//! conventions in circulation. Each convention is expressed as a declarative
//! rule table evaluated once per filename, so the brittle substring matching
//! stays isolated from the gating logic and individual conventions can be
//! swapped by a configuration tag.

use serde::{Deserialize, Serialize};

/// Metadata fields settable by plain substring rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataField {
    CellType,
    ViabilityStain,
    Timepoint,
    CaspaseInhibitor,
    Donor,
    Media,
    InsertSize,
}

/// Effect of a matched rule.
#[derive(Debug, Clone, Copy)]
pub enum RuleAction {
    /// Set a plain field. Later matching rules override earlier ones.
    Set(MetadataField, &'static str),
    /// Set the stimulus base label. The first matching rule wins.
    SetStimulus(&'static str),
    /// Append a costimulus to the stimulus label. All matches apply, in rule
    /// order; if no base matched, the last matching costimulus stands alone.
    AddCostimulus(&'static str),
}

/// One (pattern, action) entry of a rule table.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Substring to look for in the file name.
    pub pattern: &'static str,
    pub action: RuleAction,
}

impl Rule {
    const fn set(pattern: &'static str, field: MetadataField, value: &'static str) -> Self {
        Self {
            pattern,
            action: RuleAction::Set(field, value),
        }
    }

    const fn stimulus(pattern: &'static str, value: &'static str) -> Self {
        Self {
            pattern,
            action: RuleAction::SetStimulus(value),
        }
    }

    const fn costimulus(pattern: &'static str, value: &'static str) -> Self {
        Self {
            pattern,
            action: RuleAction::AddCostimulus(value),
        }
    }
}

/// Experimental metadata extracted from one acquisition file name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMetadata {
    /// Cell line ("Jurkat", "J-LAT", or "N/A" when absent from the name).
    pub cell_type: String,
    /// Stimulus label, costimuli included (e.g. "PMA+Iono", "CTL").
    pub stimulus: String,
    /// Viability stain status: "+" when 7-AAD was added, "-" for unstained.
    pub viability_stain: String,
    /// Timepoint tag ("0h".."48h"), empty when the convention carries none.
    pub timepoint: String,
    /// Replicate number probed from the stimulus label.
    pub replicate: u32,
    /// Caspase inhibitor treatment ("iCasp" / "no iCasp").
    pub caspase_inhibitor: String,
    /// Donor tag for co-culture experiments ("P1".."P4").
    pub donor: String,
    /// Culture medium for co-culture experiments ("RPMI", "LG", "HG").
    pub media: String,
    /// Transwell insert pore size for co-culture experiments.
    pub insert_size: String,
}

impl SampleMetadata {
    fn set(&mut self, field: MetadataField, value: &str) {
        let slot = match field {
            MetadataField::CellType => &mut self.cell_type,
            MetadataField::ViabilityStain => &mut self.viability_stain,
            MetadataField::Timepoint => &mut self.timepoint,
            MetadataField::CaspaseInhibitor => &mut self.caspase_inhibitor,
            MetadataField::Donor => &mut self.donor,
            MetadataField::Media => &mut self.media,
            MetadataField::InsertSize => &mut self.insert_size,
        };
        *slot = value.to_string();
    }

    /// Pooled label used to group co-culture samples (media, donor, insert).
    pub fn pooled_label(&self) -> String {
        format!("{} {}({})", self.media, self.donor, self.insert_size)
    }
}

/// Naming convention tag selecting one of the rule tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamingConvention {
    /// Induction time-course runs (timepoint tags in the name).
    Induction,
    /// Induction runs without timepoints, '-'-separated stimuli.
    InductionUntimed,
    /// Co-culture runs (donor, media and insert-size tags).
    Coculture,
    /// Reinduction runs (paired stimulus labels like "PMA-CTL").
    Reinduction,
}

impl NamingConvention {
    /// The rule table for this convention.
    pub fn rule_set(self) -> RuleSet {
        match self {
            NamingConvention::Induction => RuleSet {
                rules: induction_rules(true),
                costimulus_separator: "+",
                default_stimulus: "CTL",
                default_media: "",
                default_replicate: 1,
                replicate_probe: induction_probe,
            },
            NamingConvention::InductionUntimed => RuleSet {
                rules: induction_rules(false),
                costimulus_separator: "-",
                default_stimulus: "CTL",
                default_media: "",
                default_replicate: 1,
                replicate_probe: dashed_probe,
            },
            NamingConvention::Coculture => RuleSet {
                rules: coculture_rules(),
                costimulus_separator: "-",
                default_stimulus: "unknown",
                default_media: "RPMI",
                default_replicate: 0,
                replicate_probe: dashed_probe,
            },
            NamingConvention::Reinduction => RuleSet {
                rules: reinduction_rules(),
                costimulus_separator: "-",
                default_stimulus: "unknown",
                default_media: "",
                default_replicate: 1,
                replicate_probe: dashed_probe,
            },
        }
    }
}

/// An ordered rule table plus the convention-specific knobs that cannot be
/// expressed as single substring rules (stimulus assembly, replicate probes).
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    costimulus_separator: &'static str,
    default_stimulus: &'static str,
    default_media: &'static str,
    default_replicate: u32,
    replicate_probe: fn(&str, u32) -> String,
}

impl RuleSet {
    /// Rules in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Evaluate the table against one file name.
    pub fn evaluate(&self, file_name: &str) -> SampleMetadata {
        let mut meta = SampleMetadata {
            cell_type: "N/A".to_string(),
            stimulus: String::new(),
            viability_stain: "+".to_string(),
            timepoint: String::new(),
            replicate: self.default_replicate,
            caspase_inhibitor: "no iCasp".to_string(),
            donor: String::new(),
            media: self.default_media.to_string(),
            insert_size: String::new(),
        };

        let mut base: Option<&'static str> = None;
        let mut costimuli: Vec<&'static str> = Vec::new();
        for rule in &self.rules {
            if !file_name.contains(rule.pattern) {
                continue;
            }
            match rule.action {
                RuleAction::Set(field, value) => meta.set(field, value),
                RuleAction::SetStimulus(value) => {
                    if base.is_none() {
                        base = Some(value);
                    }
                }
                RuleAction::AddCostimulus(value) => costimuli.push(value),
            }
        }

        meta.stimulus = match base {
            Some(b) if !costimuli.is_empty() => {
                let mut label = b.to_string();
                for c in &costimuli {
                    label.push_str(self.costimulus_separator);
                    label.push_str(c);
                }
                label
            }
            Some(b) => b.to_string(),
            // Without a base stimulus a lone costimulus is the stimulus; the
            // last matching one stands (matches the original precedence).
            None => costimuli
                .last()
                .map(|c| c.to_string())
                .unwrap_or_else(|| self.default_stimulus.to_string()),
        };

        for i in 1..=3 {
            let probe = (self.replicate_probe)(&meta.stimulus, i);
            if file_name.contains(&probe) {
                meta.replicate = i;
            }
        }

        meta
    }
}

/// Parse one acquisition file name under the given convention.
pub fn parse_filename(file_name: &str, convention: NamingConvention) -> SampleMetadata {
    convention.rule_set().evaluate(file_name)
}

const TIMEPOINTS: [&str; 9] = ["0h", "1h", "2h", "4h", "8h", "16h", "24h", "30h", "48h"];

fn common_rules() -> Vec<Rule> {
    vec![
        Rule::set("Jurkat", MetadataField::CellType, "Jurkat"),
        Rule::set("J-LAT", MetadataField::CellType, "J-LAT"),
        // Unstained controls are tagged "sans" (sans 7-AAD).
        Rule::set("sans", MetadataField::ViabilityStain, "-"),
        Rule::set("Caspi", MetadataField::CaspaseInhibitor, "iCasp"),
    ]
}

fn induction_rules(with_timepoints: bool) -> Vec<Rule> {
    let mut rules = common_rules();
    rules.push(Rule::stimulus("PMA", "PMA"));
    rules.push(Rule::costimulus("Iono", "Iono"));
    rules.push(Rule::costimulus("OXA", "OXA"));
    rules.push(Rule::costimulus("JQ1", "JQ1"));
    rules.push(Rule::costimulus("RVX", "RVX"));
    if with_timepoints {
        // Order matters: "24h" must override the earlier "4h" match.
        for t in TIMEPOINTS {
            rules.push(Rule::set(t, MetadataField::Timepoint, t));
        }
    }
    rules
}

fn coculture_rules() -> Vec<Rule> {
    let mut rules = common_rules();
    // Co-culture runs only ever pair PMA with JQ1.
    rules.push(Rule::stimulus("PMA", "PMA-JQ1"));
    rules.push(Rule::stimulus("CTL", "CTL"));
    rules.push(Rule::set("P1", MetadataField::Donor, "P1"));
    rules.push(Rule::set("P2", MetadataField::Donor, "P2"));
    rules.push(Rule::set("P3", MetadataField::Donor, "P3"));
    rules.push(Rule::set("P4", MetadataField::Donor, "P4"));
    rules.push(Rule::set("LG", MetadataField::Media, "LG"));
    rules.push(Rule::set("HG", MetadataField::Media, "HG"));
    rules.push(Rule::set("insert5", MetadataField::InsertSize, "5 um"));
    rules.push(Rule::set(" 5", MetadataField::InsertSize, "5 um"));
    rules.push(Rule::set("04 ", MetadataField::InsertSize, "0.4 um"));
    rules
}

fn reinduction_rules() -> Vec<Rule> {
    let mut rules = common_rules();
    // Paired labels first so they take precedence over the plain ones.
    rules.push(Rule::stimulus("CTL-PMA", "CTL-PMA"));
    rules.push(Rule::stimulus("PMA-CTL", "PMA-CTL"));
    rules.push(Rule::stimulus("PMA-PMA", "PMA-PMA"));
    rules.push(Rule::stimulus("PMA", "PMA"));
    rules.push(Rule::stimulus("CTL", "CTL"));
    rules
}

/// Replicate probe for the induction convention: digits follow the label
/// directly ("OXA1"); combined stimuli appear space-separated in file names
/// ("PMA Iono 1").
fn induction_probe(stimulus: &str, replicate: u32) -> String {
    if stimulus.contains('+') {
        format!("{} {}", stimulus.replace('+', " "), replicate)
    } else {
        format!("{}{}", stimulus, replicate)
    }
}

/// Replicate probe for '-'-separated conventions ("PMA-JQ1-2", "CTL-1").
fn dashed_probe(stimulus: &str, replicate: u32) -> String {
    format!("{}-{}", stimulus, replicate)
}
