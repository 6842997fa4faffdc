//! Data-driven survey schemas.
//!
//! Every survey is a list of field specifications rather than a hand-written
//! form. The schema validates submitted records and tells the synthesis engine
//! which fields are numeric.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::{FieldValue, ResponseRecord};

/// Supported survey deployments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyType {
    MentalHealth,
    SexualHealth,
    DiversityEquality,
    AcademicIntegrity,
    SocioeconomicStatus,
    SubstanceUse,
}

impl SurveyType {
    pub fn all() -> [SurveyType; 6] {
        [
            SurveyType::MentalHealth,
            SurveyType::SexualHealth,
            SurveyType::DiversityEquality,
            SurveyType::AcademicIntegrity,
            SurveyType::SocioeconomicStatus,
            SurveyType::SubstanceUse,
        ]
    }

    pub fn slug(&self) -> &'static str {
        match self {
            SurveyType::MentalHealth => "mental_health",
            SurveyType::SexualHealth => "sexual_health",
            SurveyType::DiversityEquality => "diversity_equality",
            SurveyType::AcademicIntegrity => "academic_integrity",
            SurveyType::SocioeconomicStatus => "socioeconomic_status",
            SurveyType::SubstanceUse => "substance_use",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SurveyType::MentalHealth => "Mental Health Survey",
            SurveyType::SexualHealth => "Sexual Health Survey",
            SurveyType::DiversityEquality => "Diversity & Equality Survey",
            SurveyType::AcademicIntegrity => "Academic Integrity Survey",
            SurveyType::SocioeconomicStatus => "Socioeconomic Status Survey",
            SurveyType::SubstanceUse => "Substance Use Survey",
        }
    }

    pub fn database_name(&self) -> &'static str {
        match self {
            SurveyType::MentalHealth => "mental_health_survey_db",
            SurveyType::SexualHealth => "sexual_health_survey_db",
            SurveyType::DiversityEquality => "diversity_equality_survey_db",
            SurveyType::AcademicIntegrity => "academic_integrity_survey_db",
            SurveyType::SocioeconomicStatus => "socio_economic_survey_db",
            SurveyType::SubstanceUse => "substance_use_survey_db",
        }
    }

    pub fn schema(&self) -> SurveySchema {
        SurveySchema::for_survey(*self)
    }
}

impl FromStr for SurveyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SurveyType::all()
            .into_iter()
            .find(|t| t.slug() == s)
            .ok_or_else(|| Error::UnknownSurvey(s.to_string()))
    }
}

/// Input kind and its constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    /// Single choice among fixed options, stored as text
    Choice { options: Vec<String> },
    /// Integer rating slider
    Scale { min: i64, max: i64 },
    /// Free numeric entry within bounds
    Number { min: f64, max: f64 },
    /// Free text
    Text,
}

impl FieldKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Scale { .. } | FieldKind::Number { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub prompt: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    fn choice(name: &str, prompt: &str, options: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            prompt: prompt.to_string(),
            kind: FieldKind::Choice {
                options: options.iter().map(|o| o.to_string()).collect(),
            },
        }
    }

    fn scale(name: &str, prompt: &str, min: i64, max: i64) -> Self {
        Self {
            name: name.to_string(),
            prompt: prompt.to_string(),
            kind: FieldKind::Scale { min, max },
        }
    }

    fn number(name: &str, prompt: &str, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            prompt: prompt.to_string(),
            kind: FieldKind::Number { min, max },
        }
    }

    /// Check one submitted value against this field's constraints
    pub fn validate(&self, value: &FieldValue) -> Result<()> {
        let invalid = |detail: String| Error::InvalidResponse(format!("{}: {}", self.name, detail));

        match (&self.kind, value) {
            (FieldKind::Choice { options }, FieldValue::Text(s)) => {
                if options.iter().any(|o| o == s) {
                    Ok(())
                } else {
                    Err(invalid(format!("'{}' is not one of {:?}", s, options)))
                }
            }
            (FieldKind::Scale { min, max }, FieldValue::Integer(v)) => {
                if (*min..=*max).contains(v) {
                    Ok(())
                } else {
                    Err(invalid(format!("{} outside {}..={}", v, min, max)))
                }
            }
            (FieldKind::Number { min, max }, v) if v.is_numeric() => {
                let x = v.as_f64().unwrap_or(f64::NAN);
                if x >= *min && x <= *max {
                    Ok(())
                } else {
                    Err(invalid(format!("{} outside {}..={}", x, min, max)))
                }
            }
            (FieldKind::Text, FieldValue::Text(_)) => Ok(()),
            (kind, value) => Err(invalid(format!("{:?} does not accept {:?}", kind, value))),
        }
    }
}

/// Field list of one survey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveySchema {
    pub survey: SurveyType,
    pub fields: Vec<FieldSpec>,
}

const FREQUENCY: &[&str] = &["Never", "Rarely", "Sometimes", "Often"];
const PRACTICE: &[&str] = &["Never", "Occasionally", "Regularly"];
const YES_NO: &[&str] = &["Yes", "No"];

fn demographics(with_year: bool) -> Vec<FieldSpec> {
    let mut fields = vec![
        FieldSpec::number("age", "Age", 16.0, 100.0),
        FieldSpec::choice(
            "gender",
            "Gender",
            &["Male", "Female", "Non-binary", "Other", "Prefer not to say"],
        ),
    ];
    if with_year {
        fields.push(FieldSpec::choice(
            "academic_year",
            "Academic Year",
            &["Freshman", "Sophomore", "Junior", "Senior", "Graduate"],
        ));
    }
    fields.push(FieldSpec::choice(
        "living_situation",
        "Living Situation",
        &["On-campus", "Off-campus"],
    ));
    fields.push(FieldSpec::choice(
        "employment_status",
        "Employment Status",
        &["Unemployed", "Part-time", "Full-time"],
    ));
    fields
}

fn support_resources() -> Vec<FieldSpec> {
    vec![
        FieldSpec::choice("professional_help", "Professional Help Utilization", PRACTICE),
        FieldSpec::choice("access_counseling", "Access to Counseling", &["Yes", "No", "Unsure"]),
        FieldSpec::scale("support_network", "Support Network Rating", 1, 10),
        FieldSpec::choice(
            "campus_resources",
            "Knowledge of Campus Resources",
            &["Poor", "Moderate", "Good", "Excellent"],
        ),
        FieldSpec::choice(
            "barriers_help",
            "Barriers to Seeking Help",
            &["None", "Cost", "Availability", "Other"],
        ),
    ]
}

fn mental_health_scores() -> Vec<FieldSpec> {
    vec![
        FieldSpec::number("depression_score", "Depression score (PHQ-9 items)", 0.0, 27.0),
        FieldSpec::number("anxiety_score", "Anxiety score (GAD-7 items)", 0.0, 21.0),
    ]
}

fn lifestyle() -> Vec<FieldSpec> {
    vec![
        FieldSpec::choice("exercise_frequency", "Exercise Frequency", &["Never", "Rarely", "Regularly"]),
        FieldSpec::choice("meditation", "Meditation/Mindfulness Practice", PRACTICE),
        FieldSpec::choice("social_activities", "Social Activities Level", &["Low", "Moderate", "High"]),
    ]
}

fn sexual_health() -> Vec<FieldSpec> {
    vec![
        FieldSpec::choice("sexually_active", "Are you sexually active?", YES_NO),
        FieldSpec::choice(
            "contraception_use",
            "Contraception Use",
            &["Always", "Sometimes", "Never", "Not Applicable"],
        ),
        FieldSpec::scale("sti_awareness", "STI Awareness Level", 1, 10),
        FieldSpec::choice("experienced_harassment", "Have you experienced harassment?", YES_NO),
        FieldSpec::choice("experienced_assault", "Have you experienced assault?", YES_NO),
        FieldSpec::scale("consent_education", "Consent Education Level", 1, 10),
        FieldSpec::scale("support_resources_knowledge", "Support Resources Knowledge", 1, 10),
    ]
}

fn financial_hardship() -> Vec<FieldSpec> {
    vec![
        FieldSpec::choice("access_financial_aid", "Do you have access to financial aid?", YES_NO),
        FieldSpec::choice("receiving_scholarships", "Are you receiving scholarships?", YES_NO),
        FieldSpec::choice(
            "food_insecurity",
            "How often do you experience food insecurity?",
            &["Never", "Sometimes", "Often"],
        ),
        FieldSpec::choice("housing_instability", "Housing Stability", &["Stable", "Unstable"]),
        FieldSpec::scale("financial_stress", "Financial Stress Level", 1, 10),
        FieldSpec::scale(
            "impact_academic",
            "Impact of Financial Hardship on Academic Success",
            1,
            10,
        ),
    ]
}

impl SurveySchema {
    pub fn for_survey(survey: SurveyType) -> Self {
        let fields = match survey {
            SurveyType::MentalHealth => {
                let mut f = demographics(true);
                f.push(FieldSpec::scale("perceived_pressure", "Perceived pressure", 1, 5));
                f.push(FieldSpec::scale("workload_stress", "Workload stress", 1, 5));
                f.extend(mental_health_scores());
                f.push(FieldSpec::number("study_hours", "Study Hours per Week", 0.0, 100.0));
                f.push(FieldSpec::scale("academic_pressure", "Academic pressure", 1, 5));
                f.extend(lifestyle());
                f.extend(support_resources());
                f
            }
            SurveyType::SexualHealth => {
                let mut f = demographics(false);
                f.push(FieldSpec::scale("perceived_pressure", "Perceived pressure", 1, 5));
                f.extend(mental_health_scores());
                f.extend(lifestyle());
                f.extend(support_resources());
                f.extend(sexual_health());
                f
            }
            SurveyType::DiversityEquality => {
                let mut f = demographics(true);
                f.push(FieldSpec::choice(
                    "academic_dishonesty",
                    "Experiences with academic dishonesty",
                    &["None", "Minor", "Severe"],
                ));
                f.push(FieldSpec::scale("perceived_pressure", "Perceived pressure to perform well", 1, 5));
                f.push(FieldSpec::scale("workload_stress", "Workload stress", 1, 5));
                f.extend(mental_health_scores());
                f.push(FieldSpec::number("study_hours", "Study Hours per Week", 0.0, 100.0));
                f.push(FieldSpec::scale("academic_pressure", "Academic pressure", 1, 5));
                f.extend(lifestyle());
                f.extend(support_resources());
                f.extend(sexual_health());
                f.extend(financial_hardship());
                f.push(FieldSpec::choice(
                    "experienced_discrimination",
                    "Have you experienced discrimination?",
                    YES_NO,
                ));
                f.push(FieldSpec::choice(
                    "type_of_discrimination",
                    "Type of Discrimination",
                    &["None", "Gender-based", "LGBTQ+", "Disability-related", "Other"],
                ));
                f.push(FieldSpec::choice(
                    "microaggressions_faced",
                    "How often have you faced microaggressions?",
                    FREQUENCY,
                ));
                f.push(FieldSpec::scale("campus_climate", "Campus Climate Rating", 1, 10));
                f.push(FieldSpec::scale("sense_of_belonging", "Sense of Belonging", 1, 10));
                f
            }
            SurveyType::AcademicIntegrity => {
                let mut f = demographics(true);
                f.extend(support_resources());
                f.extend(financial_hardship());
                f.push(FieldSpec::choice(
                    "experienced_dishonesty",
                    "Have you experienced academic dishonesty?",
                    YES_NO,
                ));
                f.push(FieldSpec::choice(
                    "type_of_dishonesty",
                    "Type of Dishonesty",
                    &["None", "Plagiarism", "Cheating", "Other"],
                ));
                f.push(FieldSpec::scale("academic_integrity_pressure", "Perceived Pressure", 1, 10));
                f.push(FieldSpec::number("study_hours_integrity", "Study Hours Per Week", 0.0, 100.0));
                f.push(FieldSpec::scale("workload_stress_integrity", "Workload Stress Level", 1, 10));
                f
            }
            SurveyType::SocioeconomicStatus => {
                let mut f = demographics(true);
                f.extend(financial_hardship());
                f
            }
            SurveyType::SubstanceUse => vec![
                FieldSpec::choice("alcohol_use", "How often do you consume alcohol?", FREQUENCY),
                FieldSpec::choice("tobacco_use", "How often do you use tobacco?", FREQUENCY),
                FieldSpec::choice("drug_use", "How often do you use drugs?", FREQUENCY),
                FieldSpec::scale("peer_pressure", "Rate the level of peer pressure you experience", 1, 10),
                FieldSpec::scale("academic_performance", "Rate your academic performance", 1, 10),
                FieldSpec::scale("well_being", "Rate your overall well-being", 1, 10),
            ],
        };

        Self { survey, fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of fields that reach the synthesis engine
    pub fn numeric_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.kind.is_numeric())
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Validate a submission: every declared field present and within its
    /// constraints. Fields outside the schema are bookkeeping and pass through.
    pub fn validate(&self, record: &ResponseRecord) -> Result<()> {
        for spec in &self.fields {
            let value = record
                .get(&spec.name)
                .ok_or_else(|| Error::InvalidResponse(format!("missing field '{}'", spec.name)))?;
            spec.validate(value)?;
        }
        Ok(())
    }
}
