pub mod csv_chunks;
