// SR API channel endpoint

use tracing::debug;

use crate::error::Error;
use crate::sr::client::SrClient;
use crate::sr::models::{ChannelsDocument, RawChannel};

impl SrClient {
    /// List every channel, unpaginated and sorted by name.
    ///
    /// `GET channels?pagination=false&sort=name`
    pub async fn list_channels(&self) -> Result<Vec<RawChannel>, Error> {
        let url = self.endpoint("channels", &[("pagination", "false"), ("sort", "name")])?;
        let doc: ChannelsDocument = self.get_xml(url).await?;
        debug!(count = doc.channels.items.len(), "fetched channel list");
        Ok(doc.channels.items)
    }
}
