//! Advert payload: the session metadata a host replies with on `advert` queries

use zenoh_ext::{Deserialize, Serialize, ZDeserializeError, ZDeserializer, ZSerializer};

use crate::types::{OnlineSession, SessionSettings, UserId};

impl Serialize for SessionSettings {
    fn serialize(&self, serializer: &mut ZSerializer) {
        self.is_lan_match.serialize(serializer);
        self.uses_presence.serialize(serializer);
        self.num_public_connections.serialize(serializer);
        self.num_private_connections.serialize(serializer);
        self.allow_join_in_progress.serialize(serializer);
        self.should_advertise.serialize(serializer);
        self.allow_join_via_presence.serialize(serializer);
        self.allow_join_via_presence_friends_only.serialize(serializer);
        // Length-prefixed sequence of pairs, sized by the serializer
        let attributes: Vec<(String, String)> = self
            .attributes
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        attributes.serialize(serializer);
    }
}

impl Deserialize for SessionSettings {
    fn deserialize(deserializer: &mut ZDeserializer) -> Result<Self, ZDeserializeError> {
        Ok(SessionSettings {
            is_lan_match: bool::deserialize(deserializer)?,
            uses_presence: bool::deserialize(deserializer)?,
            num_public_connections: u32::deserialize(deserializer)?,
            num_private_connections: u32::deserialize(deserializer)?,
            allow_join_in_progress: bool::deserialize(deserializer)?,
            should_advertise: bool::deserialize(deserializer)?,
            allow_join_via_presence: bool::deserialize(deserializer)?,
            allow_join_via_presence_friends_only: bool::deserialize(deserializer)?,
            attributes: Vec::<(String, String)>::deserialize(deserializer)?
                .into_iter()
                .collect(),
        })
    }
}

impl Serialize for OnlineSession {
    fn serialize(&self, serializer: &mut ZSerializer) {
        self.session_id.serialize(serializer);
        self.owner.as_str().serialize(serializer);
        self.settings.serialize(serializer);
        self.num_open_public_connections.serialize(serializer);
    }
}

impl Deserialize for OnlineSession {
    fn deserialize(deserializer: &mut ZDeserializer) -> Result<Self, ZDeserializeError> {
        Ok(OnlineSession {
            session_id: String::deserialize(deserializer)?,
            owner: UserId::new(String::deserialize(deserializer)?),
            settings: SessionSettings::deserialize(deserializer)?,
            num_open_public_connections: u32::deserialize(deserializer)?,
        })
    }
}
