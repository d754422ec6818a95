// SR API schedule endpoint

use chrono::NaiveDate;
use tracing::debug;

use crate::error::Error;
use crate::sr::client::SrClient;
use crate::sr::models::{RawScheduledEpisode, ScheduleDocument};

impl SrClient {
    /// Scheduled episodes for one channel on one calendar date.
    ///
    /// `GET scheduledepisodes?pagination=false&channelid={id}&date={yyyy-MM-dd}`
    pub async fn scheduled_episodes(
        &self,
        channel_id: u32,
        date: NaiveDate,
    ) -> Result<Vec<RawScheduledEpisode>, Error> {
        let id = channel_id.to_string();
        let day = date.format("%Y-%m-%d").to_string();
        let url = self.endpoint(
            "scheduledepisodes",
            &[
                ("pagination", "false"),
                ("channelid", id.as_str()),
                ("date", day.as_str()),
            ],
        )?;
        let doc: ScheduleDocument = self.get_xml(url).await?;
        debug!(
            channel_id,
            %date,
            count = doc.schedule.items.len(),
            "fetched scheduled episodes"
        );
        Ok(doc.schedule.items)
    }
}
