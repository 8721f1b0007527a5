use anyhow::Result;
use canopy3d::canopy::FluxLedger;
use canopy3d::io::{CanopyFormat, read_canopy, write_flux_report};
use canopy3d::sim::engine::Traversal;
use canopy3d::sim::lighting::RunConfig;
use canopy3d::{
    CanopySimulation, Facet, FixedClimate, Grid, LeafAttributes, LeafScattering, LightType,
    Microfacet, Point, Ray, Side, Vector,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn leaf(r: f64, t: f64) -> LeafAttributes {
    LeafAttributes {
        reflectance: r,
        transmittance: t,
        ..Default::default()
    }
}

/// Upward-facing horizontal triangle of unit area.
fn unit_facet(z: f64, attrs: LeafAttributes) -> Facet {
    Facet::new(
        [
            Point::new(1.0, 1.0, z),
            Point::new(3.0, 1.0, z),
            Point::new(1.0, 2.0, z),
        ],
        attrs,
    )
}

fn domain() -> (Point, Point) {
    (Point::new(0., 0., 0.), Point::new(4., 4., 1.))
}

#[test]
fn test_single_facet_direct_hit() {
    let (lo, hi) = domain();
    let facet = unit_facet(0.5, leaf(0.2, 0.1));
    assert!((facet.area() - 1.0).abs() < 1e-12);
    let mut grid = Grid::new(lo, hi, vec![facet]);
    let flux = 10.0;
    let ray = Ray::new(Point::new(1.5, 1.2, 1.0), Vector::new(0., 0., -1.), flux).unwrap();
    let mut rng = StdRng::seed_from_u64(1);

    // Both secondaries spawned: 2.0 and 1.0 exceed the threshold
    let both = LeafScattering::new(Microfacet::default(), 0.5);
    let mut ledger = FluxLedger::new(1);
    assert!(grid.trace(ray, LightType::Direct, &both, &mut rng, &mut ledger));
    assert_eq!(ledger.stats.scattered, 2);

    // Only the reflected ray exceeds 1.5
    let reflected_only = LeafScattering::new(Microfacet::default(), 1.5);
    let mut ledger = FluxLedger::new(1);
    grid.trace(ray, LightType::Direct, &reflected_only, &mut rng, &mut ledger);
    assert_eq!(ledger.stats.scattered, 1);

    assert!(grid.hit(ray, 2, LightType::Direct, &both, &mut rng));
    let facet = &grid.facets()[0];
    assert!((facet.flux.get(LightType::Direct, Side::Upper, 2) - 0.7 * flux).abs() < 1e-9);
    assert_eq!(facet.flux.get(LightType::Direct, Side::Lower, 2), 0.0);
    assert_eq!(facet.flux.get(LightType::Direct, Side::Upper, 0), 0.0);
}

#[test]
fn test_hit_independent_of_resolution() {
    let (lo, hi) = domain();
    let tilted = Facet::new(
        [
            Point::new(0.7, 0.9, 0.2),
            Point::new(3.1, 1.3, 0.6),
            Point::new(1.4, 3.2, 0.8),
        ],
        leaf(0.1, 0.1),
    );
    let origin = Point::new(1.9, 1.55, 0.98);
    let direction = Vector::new(-0.4, 0.5, -1.0);

    let mut reference: Option<(f64, Point)> = None;
    let grids = [
        Grid::with_resolution(lo, hi, vec![tilted.clone()], [1, 1, 1]),
        Grid::with_resolution(lo, hi, vec![tilted.clone()], [3, 5, 2]),
        Grid::with_resolution(lo, hi, vec![tilted.clone()], [17, 11, 9]),
        Grid::new(lo, hi, vec![tilted.clone()]),
    ];
    for grid in &grids {
        let mut ray = Ray::new(origin, direction, 1.0).unwrap();
        let Traversal::Hit(hit) = grid.nearest_hit(&mut ray) else {
            panic!("ray should hit the tilted facet at {:?}", grid.resolution());
        };
        match reference {
            None => reference = Some((hit.t, hit.point)),
            Some((t, point)) => {
                assert!((hit.t - t).abs() < 1e-9);
                assert!(hit.point.is_close_tol(&point, 1e-9));
            }
        }
    }
}

#[test]
fn test_wrap_matches_shifted_origin() {
    let (lo, hi) = domain();
    let small = Facet::new(
        [
            Point::new(0.2, 1.8, 0.3),
            Point::new(0.8, 1.8, 0.3),
            Point::new(0.5, 2.4, 0.3),
        ],
        leaf(0.0, 0.0),
    );
    let grid = Grid::with_resolution(lo, hi, vec![small], [4, 4, 2]);
    let width = grid.bbox().extent().dx;

    // Leaves through +x and comes back in on the -x side
    let direction = Vector::new(1.0, 0.05, -0.7);
    let origin = Point::new(3.6, 1.9, 0.99);
    let mut wrapped = Ray::new(origin, direction, 1.0).unwrap();
    let shifted_origin = Point::new(origin.x - width, origin.y, origin.z);
    let mut shifted = Ray::new(shifted_origin, direction, 1.0).unwrap();

    let (Traversal::Hit(a), Traversal::Hit(b)) =
        (grid.nearest_hit(&mut wrapped), grid.nearest_hit(&mut shifted))
    else {
        panic!("both rays should reach the facet");
    };
    assert_eq!(a.facet, b.facet);
    assert_eq!(a.side, b.side);
    assert!((a.t - b.t).abs() < 1e-9);
    assert!(a.point.is_close_tol(&b.point, 1e-9));
}

#[test]
fn test_open_sky_column() {
    let (lo, hi) = domain();
    let mut grid = Grid::new(lo, hi, vec![unit_facet(0.5, leaf(0.2, 0.1))]);
    let scattering = LeafScattering::new(Microfacet::default(), 1e-6);
    let mut rng = StdRng::seed_from_u64(2);

    let ray = Ray::new(Point::new(3.5, 3.5, 1.0), Vector::new(0., 0., -1.), 1.0).unwrap();
    assert!(!grid.hit(ray, 0, LightType::Direct, &scattering, &mut rng));
    assert!(grid.facets().iter().all(|f| f.flux.total() == 0.0));
}

#[test]
fn test_absorbed_flux_never_exceeds_incident() {
    let mut facets = Vec::new();
    for (i, z) in [0.9, 0.6, 0.3].into_iter().enumerate() {
        let shift = 0.4 * i as f64;
        facets.push(Facet::new(
            [
                Point::new(shift, 0.0, z),
                Point::new(shift + 1.5, 0.2, z + 0.1),
                Point::new(shift + 0.3, 1.6, z - 0.1),
            ],
            leaf(0.15, 0.15),
        ));
    }
    let mut config = canopy3d::TracerConfig::new(canopy3d::sim::lighting::LightPlane::new(
        0.0, 2.0, 0.0, 2.0,
    ));
    config.ray_spacing = 0.05;
    config.ignore_flux_threshold = 0.1;
    config.seed = 7;

    let mut sim = CanopySimulation::new(facets, config).unwrap();
    let climate = FixedClimate::new(Vector::new(0.2, -0.3, -1.0), 400.0, 100.0);
    let summary = sim.run(&climate);

    let incident = (400.0 + 100.0) * 4.0;
    let absorbed = summary.absorbed_total();
    assert!(absorbed > 0.0);
    assert!(absorbed <= incident + 1e-9);

    let stored: f64 = sim.facets().iter().map(|f| f.flux.total()).sum();
    assert!((stored - absorbed).abs() < 1e-6);
}

#[test]
fn test_file_run_end_to_end() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let canopy_path = dir.path().join("canopy.csv");
    let config_path = dir.path().join("run.json");
    let report_path = dir.path().join("flux.tsv");

    std::fs::write(
        &canopy_path,
        "x1,y1,z1,x2,y2,z2,x3,y3,z3,leaf,len,pos,col,row,chl,t,r,n\n\
         0,0,0.5,1,0,0.5,0,1,0.5,1,0.2,1,1,1,40,0.1,0.1,1.2\n\
         1,1,0.3,0,1,0.3,1,0,0.3,2,0.2,2,1,2,40,0.1,0.1,1.2\n",
    )?;
    std::fs::write(
        &config_path,
        r#"{
            "tracer": {"ray_spacing": 0.1, "seed": 3,
                       "light_plane": {"x_max": 1.0, "y_max": 1.0}},
            "climate": {"latitude": 10.0, "day_of_year": 100,
                        "hours": [{"hour": 10.0, "direct": 600.0, "diffuse": 120.0},
                                  {"hour": 12.0, "direct": 800.0, "diffuse": 150.0}]},
            "format": {"layout": "field", "optics": {"kind": "from_row"}}
        }"#,
    )?;

    let config = RunConfig::from_json_file(&config_path)?;
    assert_eq!(config.format, CanopyFormat::from_model_type(2, 0.0, 0.0)?);
    let facets = read_canopy(&canopy_path, &config.format)?;
    assert_eq!(facets.len(), 2);

    let mut sim = CanopySimulation::new(facets, config.tracer.clone())?;
    let summary = sim.run(&config.climate);
    assert_eq!(summary.hours.len(), 2);
    assert!(summary.hours.iter().all(|h| h.direct_pass));

    let facets = sim.into_facets();
    assert!(facets.iter().all(|f| f.flux.num_hours() == 2));
    let hours: Vec<f64> = config.climate.hours.iter().map(|h| h.hour).collect();
    write_flux_report(&report_path, &facets, &hours, config.format.layout)?;

    let text = std::fs::read_to_string(&report_path)?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    let header: Vec<&str> = lines[0].split('\t').collect();
    assert_eq!(header.len(), 18 + 1 + 12);
    assert!(header.contains(&"up_dir_10"));
    assert!(header.contains(&"down_scat_12"));

    // The upper leaf shades the lower one, but both catch some light
    let up_dir = header.iter().position(|h| *h == "up_dir_12").unwrap();
    let top: f64 = lines[1].split('\t').nth(up_dir).unwrap().parse()?;
    assert!(top > 0.0);
    Ok(())
}
