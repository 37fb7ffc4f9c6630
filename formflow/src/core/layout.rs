//! Static assignment of fields to steps and groups.

use std::collections::HashSet;

use anyhow::{Result, anyhow};

use crate::core::types::{FieldMap, FieldValue, GroupedData};

/// Input kind of a field, which decides its value shape and persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Select,
    /// Single choice from a radio group.
    Choice,
    /// Checkbox group.
    Multi,
    /// User-extendable list of text inputs.
    Repeated,
    /// File upload; never persisted.
    File,
}

impl FieldKind {
    /// True when the field's value is a list.
    pub fn is_list(self) -> bool {
        matches!(self, Self::Multi | Self::Repeated)
    }

    pub fn default_value(self) -> FieldValue {
        if self.is_list() {
            FieldValue::Many(Vec::new())
        } else {
            FieldValue::Text(String::new())
        }
    }
}

/// How a field appears on the review step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewFormat {
    /// Raw value, `Not provided` when empty.
    Plain,
    /// Non-blank entries joined by `, `, `None` when empty.
    List,
    /// Raw value, `Not specified` when empty.
    Optional,
    /// Attached file name, `No Image` when empty.
    Photo,
    /// `<currency> <amount>` using the named currency field.
    Amount { currency_field: String },
    /// Not shown on its own.
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub review: ReviewFormat,
}

impl FieldSpec {
    pub fn new(name: &str, kind: FieldKind, review: ReviewFormat) -> Self {
        Self {
            name: name.to_string(),
            kind,
            review,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSpec {
    /// 1-indexed position.
    pub number: u32,
    /// Group name used for the consolidated `data` snapshot.
    pub group: String,
    /// Fields in document order.
    pub fields: Vec<FieldSpec>,
}

/// Ordered list of steps; the last one is the terminal review step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormLayout {
    steps: Vec<StepSpec>,
}

impl FormLayout {
    /// Build a layout from `(group, fields)` pairs, numbering steps from 1.
    pub fn new(steps: Vec<(String, Vec<FieldSpec>)>) -> Result<Self> {
        let steps: Vec<StepSpec> = steps
            .into_iter()
            .enumerate()
            .map(|(idx, (group, fields))| StepSpec {
                number: idx as u32 + 1,
                group,
                fields,
            })
            .collect();
        let layout = Self { steps };
        layout.validate()?;
        Ok(layout)
    }

    /// Layout of the job application form the engine ships with.
    pub fn builtin() -> Self {
        use FieldKind::{Choice, File, Multi, Repeated, Select, Text};
        use ReviewFormat::{Hidden, List, Optional, Photo, Plain};

        let f = FieldSpec::new;
        Self {
            steps: vec![
                StepSpec {
                    number: 1,
                    group: "personalInfo".to_string(),
                    fields: vec![
                        f("fullName", Text, Plain),
                        f("dob", Text, Plain),
                        f("gender", Choice, Plain),
                        f("nationalId", Text, Plain),
                        f("profilePhoto", File, Photo),
                    ],
                },
                StepSpec {
                    number: 2,
                    group: "contactInfo".to_string(),
                    fields: vec![
                        f("email", Text, Plain),
                        f("mobile", Text, Plain),
                        f("alternateContact", Text, Plain),
                        f("country", Select, Plain),
                        f("city", Select, Plain),
                        f("currentAddress", Text, Plain),
                        f("permanentAddress", Text, Plain),
                    ],
                },
                StepSpec {
                    number: 3,
                    group: "education".to_string(),
                    fields: vec![
                        f("highestDegree", Select, Plain),
                        f("fieldOfStudy", Text, Plain),
                        f("institution", Text, Plain),
                        f("graduationYear", Text, Plain),
                        f("gpa", Text, Plain),
                        f("certifications", Repeated, List),
                    ],
                },
                StepSpec {
                    number: 4,
                    group: "experience".to_string(),
                    fields: vec![
                        f("currentJobTitle", Text, Plain),
                        f("companyName", Text, Plain),
                        f("totalExperience", Text, Plain),
                        f("previousJobs", Repeated, List),
                        f("responsibilities", Text, Plain),
                    ],
                },
                StepSpec {
                    number: 5,
                    group: "skills".to_string(),
                    fields: vec![
                        f("technicalSkills", Multi, List),
                        f("softSkills", Multi, List),
                        f("jobType", Select, Optional),
                        f("relocate", Choice, Optional),
                        f(
                            "expectedSalary",
                            Text,
                            ReviewFormat::Amount {
                                currency_field: "salaryCurrency".to_string(),
                            },
                        ),
                        f("salaryCurrency", Select, Hidden),
                    ],
                },
                StepSpec {
                    number: 6,
                    group: "review".to_string(),
                    fields: Vec::new(),
                },
            ],
        }
    }

    fn validate(&self) -> Result<()> {
        if self.steps.len() < 2 {
            return Err(anyhow!(
                "layout needs at least 2 steps (got {})",
                self.steps.len()
            ));
        }
        let mut groups = HashSet::new();
        for step in &self.steps {
            if step.group.trim().is_empty() {
                return Err(anyhow!("step {} has no group name", step.number));
            }
            if !groups.insert(step.group.as_str()) {
                return Err(anyhow!("duplicate group '{}'", step.group));
            }
        }
        let mut seen = HashSet::new();
        for field in self.fields() {
            if !seen.insert(field.name.as_str()) {
                return Err(anyhow!("duplicate field '{}'", field.name));
            }
        }
        for field in self.fields() {
            if let ReviewFormat::Amount { currency_field } = &field.review {
                if !seen.contains(currency_field.as_str()) {
                    return Err(anyhow!(
                        "{}: unknown currency field '{}'",
                        field.name,
                        currency_field
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn total_steps(&self) -> u32 {
        self.steps.len() as u32
    }

    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }

    pub fn step(&self, number: u32) -> Option<&StepSpec> {
        let idx = usize::try_from(number).ok()?.checked_sub(1)?;
        self.steps.get(idx)
    }

    pub fn is_terminal(&self, number: u32) -> bool {
        number == self.total_steps()
    }

    /// All fields in document order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.steps.iter().flat_map(|step| step.fields.iter())
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields().find(|field| field.name == name)
    }

    /// Step number the named field belongs to.
    pub fn step_of(&self, name: &str) -> Option<u32> {
        self.steps
            .iter()
            .find(|step| step.fields.iter().any(|field| field.name == name))
            .map(|step| step.number)
    }

    pub fn is_file(&self, name: &str) -> bool {
        self.field(name)
            .is_some_and(|field| field.kind == FieldKind::File)
    }

    /// Every field at its empty default.
    pub fn default_values(&self) -> FieldMap {
        self.fields()
            .map(|field| (field.name.clone(), field.kind.default_value()))
            .collect()
    }

    /// Regroup live values by step group, filling gaps with defaults.
    ///
    /// Steps without fields do not produce a group.
    pub fn group_values(&self, values: &FieldMap) -> GroupedData {
        let mut grouped = GroupedData::new();
        for step in &self.steps {
            if step.fields.is_empty() {
                continue;
            }
            let group = grouped.entry(step.group.clone()).or_default();
            for field in &step.fields {
                let value = values
                    .get(&field.name)
                    .cloned()
                    .unwrap_or_else(|| field.kind.default_value());
                group.insert(field.name.clone(), value);
            }
        }
        grouped
    }
}
