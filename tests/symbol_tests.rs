#[cfg(test)]
mod tests {
    use kodegen_bundler_payload::payload::{PayloadIdentity, PayloadKind, RemotePayloadField, VersionInfo};
    use kodegen_bundler_payload::relation::{
        self, BundleRelation, RelatedBundleAction, RelatedBundleSymbol,
    };
    use kodegen_bundler_payload::symbol::{
        Error, FieldDefinition, FieldType, FieldValue, SerializedSymbol, Symbol, SymbolRegistry,
    };
    use std::path::PathBuf;

    fn large_payload() -> PayloadIdentity {
        PayloadIdentity {
            source_path: PathBuf::from("/payloads/disk1.cab"),
            name: "disk1.cab".to_string(),
            canonical_name: "media/disk1.cab".to_string(),
            download_url: None,
            kind: PayloadKind::File,
            hash: "00".repeat(64),
            size: 6_000_000_000,
            version_info: Some(VersionInfo {
                file_version: Some("1.0.0.0".to_string()),
                product_name: None,
                description: None,
            }),
            certificate: None,
        }
    }

    #[test]
    fn test_custom_definition_enforces_types() {
        let mut registry = SymbolRegistry::with_builtin_definitions();
        let definition = registry
            .define(
                "Feature",
                vec![
                    FieldDefinition::new("Title", FieldType::String),
                    FieldDefinition::new("Level", FieldType::Number),
                    FieldDefinition::new("Hidden", FieldType::Bool),
                ],
            )
            .expect("define");
        let mut symbol = Symbol::new(definition, None, None);

        symbol.set(0usize, "Main").expect("title");
        symbol.set(1usize, 3i32).expect("level");
        symbol.set(2usize, true).expect("hidden");

        assert!(matches!(
            symbol.set(1usize, "three"),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            symbol.set(3usize, 1i32),
            Err(Error::SchemaViolation { index: 3, field_count: 3, .. })
        ));
        assert!(matches!(symbol.get_bool(0usize), Err(Error::TypeMismatch { .. })));
        assert_eq!(symbol.get_bool(2usize), Ok(Some(true)));
        assert_eq!(symbol.get(1usize), Ok(Some(&FieldValue::Number(3))));
    }

    #[test]
    fn test_duplicate_and_unknown_definitions() {
        let mut registry = SymbolRegistry::with_builtin_definitions();
        let builtin_count = registry.len();

        assert!(matches!(
            registry.define(relation::RELATED_BUNDLE, Vec::new()),
            Err(Error::DuplicateDefinition(_))
        ));
        assert!(matches!(
            registry.get("WixBundlePackage"),
            Err(Error::UnknownDefinition(_))
        ));
        assert_eq!(registry.len(), builtin_count);
    }

    #[test]
    fn test_intermediate_json_round_trip() {
        let registry = SymbolRegistry::with_builtin_definitions();
        let payload = large_payload().to_symbol(&registry).expect("payload symbol");
        let related = relation::classify(
            &registry,
            &BundleRelation {
                bundle_id: "{11111111-2222-3333-4444-555555555555}".to_string(),
                action: RelatedBundleAction::Patch,
            },
            None,
        )
        .expect("classify")
        .into_symbol();

        let serialized = vec![payload.to_serialized(), related.to_serialized()];
        let json = serde_json::to_string(&serialized).expect("serialize");
        let parsed: Vec<SerializedSymbol> = serde_json::from_str(&json).expect("deserialize");

        let rebuilt: Vec<Symbol> = parsed
            .into_iter()
            .map(|s| s.into_symbol(&registry).expect("rebuild"))
            .collect();
        assert_eq!(rebuilt, vec![payload, related.clone()]);

        assert_eq!(
            rebuilt[0].get_large_number(RemotePayloadField::Size),
            Ok(Some(6_000_000_000))
        );
        let relation = RelatedBundleSymbol::from_symbol(rebuilt[1].clone())
            .and_then(|s| s.relation())
            .expect("relation");
        assert_eq!(relation.action, RelatedBundleAction::Patch);
    }

    #[test]
    fn test_small_size_survives_json_as_large_number() {
        let registry = SymbolRegistry::with_builtin_definitions();
        let mut identity = large_payload();
        identity.size = 16;
        let symbol = identity.to_symbol(&registry).expect("symbol");

        let json = serde_json::to_value(symbol.to_serialized()).expect("serialize");
        let parsed: SerializedSymbol = serde_json::from_value(json).expect("deserialize");
        let rebuilt = parsed.into_symbol(&registry).expect("rebuild");

        assert_eq!(rebuilt.get_large_number(RemotePayloadField::Size), Ok(Some(16)));
        assert_eq!(rebuilt, symbol);
    }

    #[test]
    fn test_wrong_value_count_rejected() {
        let registry = SymbolRegistry::with_builtin_definitions();
        let serialized = SerializedSymbol {
            definition: relation::RELATED_BUNDLE.to_string(),
            id: None,
            source: None,
            fields: vec![Some(FieldValue::from("{GUID}"))],
        };

        assert!(matches!(
            serialized.into_symbol(&registry),
            Err(Error::ValueCount { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_action_numbers_are_stable() {
        for (number, action) in RelatedBundleAction::ALL.iter().enumerate() {
            assert_eq!(action.as_number(), number as i32);
            assert_eq!(RelatedBundleAction::try_from(number as i32), Ok(*action));
        }
        assert!(matches!(
            RelatedBundleAction::try_from(4),
            Err(relation::Error::InvalidAction(_))
        ));
    }
}
