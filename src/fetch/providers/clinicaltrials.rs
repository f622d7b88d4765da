//! ClinicalTrials.gov v2 adapter: `pageToken` pagination over `/studies`,
//! two query strategies (condition first, free term second) accumulated
//! with NCT-id dedup.

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use crate::fetch::types::{RawRecord, RawTrial, SourceAdapter};
use crate::fetch::{build_client, get_json, FetchConfig};
use crate::registry::SourceId;

const BASE_URL: &str = "https://clinicaltrials.gov/api/v2";
const PAGE_SIZE: usize = 100;

// Keep the response payload down to what the raw shape carries.
const FIELDS: &str = "NCTId,BriefTitle,OfficialTitle,OverallStatus,Phase,StartDate,\
CompletionDate,EnrollmentCount,StudyType,InterventionName,InterventionType,\
LeadSponsorName,CollaboratorName,LocationCountry,BriefSummary,\
PrimaryOutcomeMeasure,MinimumAge,MaximumAge,Sex";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StudiesPage {
    studies: Vec<Study>,
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Study {
    protocol_section: ProtocolSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProtocolSection {
    identification_module: IdentificationModule,
    status_module: StatusModule,
    design_module: DesignModule,
    description_module: DescriptionModule,
    arms_interventions_module: ArmsInterventionsModule,
    sponsor_collaborators_module: SponsorCollaboratorsModule,
    contacts_locations_module: ContactsLocationsModule,
    eligibility_module: EligibilityModule,
    outcomes_module: OutcomesModule,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct IdentificationModule {
    nct_id: Option<String>,
    brief_title: Option<String>,
    official_title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StatusModule {
    overall_status: Option<String>,
    start_date_struct: DateStruct,
    completion_date_struct: DateStruct,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DateStruct {
    date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DesignModule {
    phases: Vec<String>,
    study_type: Option<String>,
    enrollment_info: EnrollmentInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnrollmentInfo {
    count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DescriptionModule {
    brief_summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArmsInterventionsModule {
    interventions: Vec<Intervention>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Intervention {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SponsorCollaboratorsModule {
    lead_sponsor: Agency,
    collaborators: Vec<Agency>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Agency {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContactsLocationsModule {
    locations: Vec<Location>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Location {
    country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EligibilityModule {
    minimum_age: Option<String>,
    maximum_age: Option<String>,
    sex: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct OutcomesModule {
    primary_outcomes: Vec<Outcome>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Outcome {
    measure: Option<String>,
}

pub struct ClinicalTrialsAdapter {
    client: reqwest::Client,
    cfg: FetchConfig,
    base_url: String,
}

impl ClinicalTrialsAdapter {
    pub fn new(cfg: &FetchConfig) -> Self {
        Self {
            client: build_client(cfg.timeout_secs),
            cfg: cfg.clone(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Pure mapping of one study payload into the raw trial shape.
    fn raw_from_study(study: Study) -> RawTrial {
        let p = study.protocol_section;
        let nct_id = p.identification_module.nct_id.unwrap_or_default();

        let mut countries: Vec<String> = p
            .contacts_locations_module
            .locations
            .iter()
            .filter_map(|l| l.country.clone())
            .filter(|c| !c.is_empty())
            .collect();
        countries.sort();
        countries.dedup();

        RawTrial {
            url: if nct_id.is_empty() {
                String::new()
            } else {
                format!("https://clinicaltrials.gov/study/{nct_id}")
            },
            nct_id,
            title: p.identification_module.brief_title.unwrap_or_default(),
            official_title: p.identification_module.official_title.unwrap_or_default(),
            status: p.status_module.overall_status.unwrap_or_default(),
            phase: p
                .design_module
                .phases
                .first()
                .cloned()
                .unwrap_or_else(|| "N/A".to_string()),
            start_date: p.status_module.start_date_struct.date.unwrap_or_default(),
            completion_date: p
                .status_module
                .completion_date_struct
                .date
                .unwrap_or_default(),
            enrollment: p.design_module.enrollment_info.count,
            study_type: p.design_module.study_type.unwrap_or_default(),
            sponsor: p
                .sponsor_collaborators_module
                .lead_sponsor
                .name
                .unwrap_or_default(),
            collaborators: p
                .sponsor_collaborators_module
                .collaborators
                .into_iter()
                .filter_map(|a| a.name)
                .collect(),
            num_locations: p.contacts_locations_module.locations.len() as u64,
            countries,
            interventions: p
                .arms_interventions_module
                .interventions
                .into_iter()
                .filter_map(|i| i.name)
                .collect(),
            min_age: p.eligibility_module.minimum_age.unwrap_or_default(),
            max_age: p.eligibility_module.maximum_age.unwrap_or_default(),
            sex: p.eligibility_module.sex.unwrap_or_default(),
            primary_outcomes: p
                .outcomes_module
                .primary_outcomes
                .into_iter()
                .take(3)
                .filter_map(|o| o.measure)
                .collect(),
            summary: p.description_module.brief_summary.unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Parse one page payload. Public for fixture-driven tests.
    pub fn records_from_page(v: serde_json::Value) -> Result<(Vec<RawTrial>, Option<String>)> {
        let page: StudiesPage = serde_json::from_value(v)?;
        let token = page.next_page_token;
        Ok((
            page.studies.into_iter().map(Self::raw_from_study).collect(),
            token,
        ))
    }
}

#[async_trait]
impl SourceAdapter for ClinicalTrialsAdapter {
    fn source(&self) -> SourceId {
        SourceId::ClinicalTrials
    }

    async fn fetch(&self, term: &str, limit: usize) -> Result<Vec<RawRecord>> {
        let mut out: Vec<RawRecord> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut first_error: Option<anyhow::Error> = None;
        let mut any_page_ok = false;

        let strategies: [(&str, String); 2] =
            [("query.cond", term.to_string()), ("query.term", term.to_string())];

        'strategies: for (key, value) in strategies {
            let mut page_token: Option<String> = None;
            loop {
                if out.len() >= limit {
                    break 'strategies;
                }
                let mut params = vec![
                    (key, value.clone()),
                    ("pageSize", PAGE_SIZE.min(limit - out.len()).to_string()),
                    ("format", "json".to_string()),
                    ("fields", FIELDS.to_string()),
                ];
                if let Some(token) = &page_token {
                    params.push(("pageToken", token.clone()));
                }

                let url = format!("{}/studies", self.base_url);
                let payload = match get_json(&self.client, &url, &params, &self.cfg).await {
                    Ok(v) => v,
                    Err(e) => {
                        counter!("fetch_page_errors_total").increment(1);
                        tracing::warn!(error = ?e, "clinicaltrials page fetch failed");
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                        continue 'strategies;
                    }
                };

                let (trials, next_token) = match Self::records_from_page(payload) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        counter!("fetch_page_errors_total").increment(1);
                        tracing::warn!(error = ?e, "clinicaltrials page parse failed");
                        continue 'strategies;
                    }
                };
                any_page_ok = true;

                if trials.is_empty() {
                    continue 'strategies;
                }
                for trial in trials {
                    if !trial.nct_id.is_empty() && !seen.insert(trial.nct_id.clone()) {
                        continue;
                    }
                    out.push(RawRecord::Trial(trial));
                    if out.len() >= limit {
                        break 'strategies;
                    }
                }

                page_token = next_token;
                if page_token.is_none() {
                    continue 'strategies;
                }
                tokio::time::sleep(Duration::from_millis(self.cfg.page_delay_ms)).await;
            }
        }

        // Systemic failure: nothing was reachable at all.
        if out.is_empty() && !any_page_ok {
            if let Some(e) = first_error {
                return Err(e);
            }
        }
        Ok(out)
    }
}
