use polis::{
    NoiseTerrain, NoiseTerrainConfig, Planet, RefineConfig, Seed,
    TileCacheConfig, WorldConfig,
};
use validator::ValidationErrors;

fn validation_fields(err: anyhow::Error) -> Vec<&'static str> {
    let validation_errors = err.downcast::<ValidationErrors>().unwrap();
    let mut error_fields = validation_errors
        .errors()
        .keys()
        .copied()
        .collect::<Vec<&str>>();
    error_fields.sort_unstable();
    error_fields
}

#[test]
fn test_config_validation() {
    let config = WorldConfig {
        seed: Seed::Int(0),
        mesh_level: 9,       // invalid (too big)
        city_count: 0,       // invalid
        terrain_weight: 0.0, // valid (roads ignore terrain)
        edge_samples: 1,     // valid
        refine: RefineConfig {
            passes: 5,     // invalid
            level_step: 1, // valid
        },
        tiles: TileCacheConfig {
            capacity: 1,         // valid (but thrashy)
            grid_resolution: 2,  // valid
            city_threshold: 1.5, // invalid
            max_border_tiles: 1, // valid
        },
        oracle_timeout_ms: 0, // invalid
    };
    let oracle = NoiseTerrain::new(NoiseTerrainConfig::default()).unwrap();

    // This is a bit of a lazy check but it works well enough
    let err = Planet::new(config, oracle).unwrap_err();
    assert_eq!(
        validation_fields(err),
        vec![
            "city_count",
            "mesh_level",
            "oracle_timeout_ms",
            "refine",
            "tiles"
        ],
    );
}

#[test]
fn test_noise_config_validation() {
    let mut config = NoiseTerrainConfig::default();
    config.height.frequency = -1.0;
    let err = NoiseTerrain::new(config).unwrap_err();
    assert_eq!(validation_fields(err), vec!["height"]);
}
