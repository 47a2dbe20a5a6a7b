use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn encode<T>(value: &T) -> Option<Vec<u8>>
where
    T: Serialize,
{
    serde_json::to_vec(value).ok()
}

pub fn decode<T>(bytes: &[u8]) -> Option<T>
where
    T: DeserializeOwned,
{
    serde_json::from_slice(bytes).ok()
}
