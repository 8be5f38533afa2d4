pub mod balance_graph;
