use rand::Rng;
use std::fs::{self, File};
use std::io::{BufWriter, Write};

const ROWS: usize = 1_000_000;
const ENTITIES: [&str; 3] = ["L1", "L2", "L3"];
const STATUSES: [&str; 3] = ["ARAP", "ACCR", "PAID"];
const COUNTERPARTIES: usize = 12;
// C10..C12 get no tier, so a share of records is dropped by the join
const TIERED_COUNTERPARTIES: usize = 9;

fn main() -> std::io::Result<()> {
    fs::create_dir_all("inputs")?;
    let mut rng = rand::rng();

    let records_path = "inputs/dataset1.csv";
    let mut writer = BufWriter::new(File::create(records_path)?);
    writeln!(writer, "invoice_id,legal_entity,counter_party,rating,status,value")?;
    for i in 0..ROWS {
        let entity = ENTITIES[rng.random_range(0..ENTITIES.len())];
        let counterparty = rng.random_range(1..=COUNTERPARTIES);
        let rating = rng.random_range(1..=6);
        let status = STATUSES[rng.random_range(0..STATUSES.len())];
        let value = rng.random_range(1..1000);
        writeln!(
            writer,
            "{},{},C{},{},{},{}",
            i + 1,
            entity,
            counterparty,
            rating,
            status,
            value
        )?;
    }
    writer.flush()?;

    let tiers_path = "inputs/dataset2.csv";
    let mut writer = BufWriter::new(File::create(tiers_path)?);
    writeln!(writer, "counter_party,tier")?;
    for cp in 1..=TIERED_COUNTERPARTIES {
        writeln!(writer, "C{},{}", cp, rng.random_range(1..=6))?;
    }
    writer.flush()?;

    println!("Sample CSVs generated: {}, {}", records_path, tiers_path);
    Ok(())
}
