use serde::Deserialize;

/// One platform row exactly as the upstream TfGM OData feed shapes it. Field
/// names are carried through unmodified (including the casing) since they
/// come straight off the wire.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Deserialize)]
pub struct RawPidRecord {
    pub StationLocation: String,
    pub AtcoCode: String,
    #[serde(default)]
    pub Direction: String,
    pub LastUpdated: String,
    #[serde(default)]
    pub MessageBoard: String,

    #[serde(default, rename = "Dest0")]
    pub dest0: String,
    #[serde(default, rename = "Dest1")]
    pub dest1: String,
    #[serde(default, rename = "Dest2")]
    pub dest2: String,
    #[serde(default, rename = "Dest3")]
    pub dest3: String,

    #[serde(default, rename = "Carriages0")]
    pub carriages0: String,
    #[serde(default, rename = "Carriages1")]
    pub carriages1: String,
    #[serde(default, rename = "Carriages2")]
    pub carriages2: String,
    #[serde(default, rename = "Carriages3")]
    pub carriages3: String,

    #[serde(default, rename = "Status0")]
    pub status0: String,
    #[serde(default, rename = "Status1")]
    pub status1: String,
    #[serde(default, rename = "Status2")]
    pub status2: String,
    #[serde(default, rename = "Status3")]
    pub status3: String,

    #[serde(default, rename = "Wait0")]
    pub wait0: String,
    #[serde(default, rename = "Wait1")]
    pub wait1: String,
    #[serde(default, rename = "Wait2")]
    pub wait2: String,
    #[serde(default, rename = "Wait3")]
    pub wait3: String,
}

impl RawPidRecord {
    /// The four destination slots as `(dest, carriages, status, wait)`
    /// quadruples, in feed order, preserved as raw strings for the decoder
    /// to interpret (spec §4.D).
    pub fn slots(&self) -> [(&str, &str, &str, &str); 4] {
        [
            (&self.dest0, &self.carriages0, &self.status0, &self.wait0),
            (&self.dest1, &self.carriages1, &self.status1, &self.wait1),
            (&self.dest2, &self.carriages2, &self.status2, &self.wait2),
            (&self.dest3, &self.carriages3, &self.status3, &self.wait3),
        ]
    }

    pub fn canonical_id(&self) -> String {
        format!("{}_{}", self.StationLocation, self.AtcoCode)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedEnvelope {
    pub value: Vec<RawPidRecord>,
}
