crate::define_tag_enum! {
    /// Toolchain family a build strategy drives
    StrategyId {
        CustomScript => "custom-script" : "Custom script" | "script",
        Scons => "scons" : "SCons" | "Scons",
        Autotools => "autotools" : "Autotools" | "autoconf",
        CMake => "cmake" : "CMake",
        Meson => "meson" : "Meson",
        Bazel => "bazel" : "Bazel",
        Gradle => "gradle" : "Gradle/Ant/Maven" | "Gradle" | "maven" | "ant",
        SolutionFile => "solution-file" : "Solution file" | "msbuild" | "sln",
        Make => "make" : "Make" | "makefile",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_id_serializes_as_tag() {
        assert_eq!(
            serde_json::to_string(&StrategyId::CustomScript).unwrap(),
            "\"custom-script\""
        );
        assert_eq!(
            serde_json::to_string(&StrategyId::CMake).unwrap(),
            "\"cmake\""
        );
    }

    #[test]
    fn test_strategy_id_round_trips_through_tag() {
        for id in StrategyId::all_variants() {
            let parsed: StrategyId = id.tag().parse().unwrap();
            assert_eq!(parsed, *id);
        }
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        assert!(serde_json::from_str::<StrategyId>("\"cargo\"").is_err());
        assert!("cargo".parse::<StrategyId>().is_err());
    }

    #[test]
    fn test_from_name_with_aliases() {
        assert_eq!(StrategyId::from_name("maven"), Some(StrategyId::Gradle));
        assert_eq!(StrategyId::from_name("SCons"), Some(StrategyId::Scons));
        assert_eq!(StrategyId::from_name("sln"), Some(StrategyId::SolutionFile));
        assert_eq!(StrategyId::from_name("unknown"), None);
    }

    #[test]
    fn test_display_uses_tag() {
        assert_eq!(StrategyId::SolutionFile.to_string(), "solution-file");
        assert_eq!(StrategyId::Gradle.name(), "Gradle/Ant/Maven");
    }
}
