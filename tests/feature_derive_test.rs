#[cfg(feature = "derive")]
#[cfg(test)]
mod tests {
    use hashring_continuum::RingConfig;

    #[test]
    fn test_serialize_and_deserialize_ring_config() {
        let original = RingConfig::new().base_points(160).unweighted();

        // Serialize the `RingConfig` instance to JSON
        let serialized = serde_json::to_string(&original).expect("Serialization failed");

        // Deserialize the JSON string back into a `RingConfig` instance
        let deserialized: RingConfig =
            serde_json::from_str(&serialized).expect("Deserialization failed");

        // Assert that the original and deserialized instances are equal
        assert_eq!(original, deserialized);
    }
}
