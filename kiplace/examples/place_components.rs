//! Placement example: create a project, place a few parts and list them.

use kiplace::prelude::*;
use std::path::Path;

fn main() -> Result<(), KiplaceError> {
    let dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "target/place_components_demo".to_string());

    let options = PlacementOptions::default();
    let project = KiplaceCore::try_create_project(&ProjectRequest::new("demo", &dir), &options)?;
    println!("Created {}", project.pcb_file.display());

    let parts = [
        ("10k", "Resistor_SMD:R_0603_1608Metric", 10.0, 10.0, "front"),
        ("10k", "Resistor_SMD:R_0603_1608Metric", 15.0, 10.0, "front"),
        ("100n", "Capacitor_SMD:C_0402_1005Metric", 20.0, 10.0, "back"),
    ];
    for (value, footprint, x, y, side) in parts {
        let request = ComponentRequest::new(value, footprint, x, y).layer(side);
        let component = KiplaceCore::try_add_component(&project.pcb_file, &request, &options)?;
        println!("  placed {} ({}) at {}, {}", component.reference, value, x, y);
    }

    println!();
    for component in KiplaceCore::try_get_components(Path::new(&project.pcb_file))? {
        println!(
            "{:<4} {:<6} {:<36} {:>6.2} {:>6.2} {}",
            component.reference,
            component.value,
            component.footprint,
            component.position.x,
            component.position.y,
            component.layer
        );
    }

    Ok(())
}
