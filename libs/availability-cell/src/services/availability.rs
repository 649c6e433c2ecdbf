use chrono::NaiveDate;
use reqwest::Method;
use tracing::{debug, info};

use shared_backend::ClinicApiClient;
use shared_config::AppConfig;

use crate::date_key::{parse_date_key, CalendarMonth};
use crate::models::{
    AvailabilityError, DailyQuota, MonthCalendar, SlotAvailability, Therapist, TherapistRoster,
};
use crate::services::catalog::SlotCatalog;
use crate::services::evaluator::evaluate_selection;
use crate::services::index::AvailabilityIndex;

pub const HOME_DETAILS_PATH: &str = "/api/admin/bookings/home-details";

pub struct AvailabilityService {
    client: ClinicApiClient,
    catalog: SlotCatalog,
    quota: DailyQuota,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: ClinicApiClient::new(config),
            catalog: SlotCatalog::reference(),
            quota: DailyQuota::from_config(config),
        }
    }

    pub fn catalog(&self) -> SlotCatalog {
        self.catalog
    }

    pub fn quota(&self) -> DailyQuota {
        self.quota
    }

    /// Fetches the therapist roster with holidays and booked slots.
    pub async fn fetch_roster(&self, auth_token: &str) -> Result<Vec<Therapist>, AvailabilityError> {
        debug!("Fetching therapist roster");

        let roster: TherapistRoster = self
            .client
            .request(Method::GET, HOME_DETAILS_PATH, Some(auth_token), None)
            .await?;

        debug!("Roster contains {} therapists", roster.therapists.len());
        Ok(roster.therapists)
    }

    /// Slot verdicts for a date and an optional therapist selection.
    pub async fn evaluate(
        &self,
        date: &str,
        therapist_id: Option<&str>,
        auth_token: &str,
    ) -> Result<SlotAvailability, AvailabilityError> {
        let date = parse_date_key(date).ok_or_else(|| AvailabilityError::InvalidDate(date.to_string()))?;
        let roster = self.fetch_roster(auth_token).await?;

        Ok(self.evaluate_with_roster(&roster, therapist_id, date))
    }

    pub fn evaluate_with_roster(
        &self,
        roster: &[Therapist],
        therapist_id: Option<&str>,
        date: NaiveDate,
    ) -> SlotAvailability {
        evaluate_selection(roster, therapist_id, date, &self.catalog, self.quota)
    }

    /// Per-day summary of one therapist's month.
    pub async fn month_calendar(
        &self,
        therapist_id: &str,
        month: &str,
        auth_token: &str,
    ) -> Result<MonthCalendar, AvailabilityError> {
        let month = CalendarMonth::parse(month).ok_or_else(|| AvailabilityError::InvalidMonth(month.to_string()))?;
        let roster = self.fetch_roster(auth_token).await?;

        let therapist = roster
            .iter()
            .find(|therapist| therapist.id == therapist_id)
            .ok_or_else(|| AvailabilityError::TherapistNotFound(therapist_id.to_string()))?;

        let index = AvailabilityIndex::build(std::slice::from_ref(therapist), month, self.catalog, self.quota);
        let calendar = index
            .month_calendar(therapist_id)
            .ok_or_else(|| AvailabilityError::TherapistNotFound(therapist_id.to_string()))?;

        info!(
            "Calendar for therapist {} in {}: {} bookable days",
            therapist_id,
            month,
            calendar.days.iter().filter(|day| day.bookable).count()
        );

        Ok(calendar)
    }
}
