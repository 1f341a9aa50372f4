pub mod energy_record_queries;
