//! Wire messages for summaries exchanged between nodes
//!
//! Declared directly with prost derives so the crate builds without protoc.
//! Field tags are part of the wire contract and must never be reused.

pub mod heat {
    pub mod v1 {
        use prost::Message;

        /// Terminal result for a single named consumer
        #[derive(Clone, PartialEq, Message)]
        pub struct TopConsumerSummaryMessage {
            #[prost(string, tag = "1")]
            pub name: String,
            #[prost(double, tag = "2")]
            pub value: f64,
        }

        /// One shard's temperature for one dimension
        #[derive(Clone, PartialEq, Message)]
        pub struct ShardProfileSummaryMessage {
            #[prost(string, tag = "1")]
            pub index_name: String,
            #[prost(int32, tag = "2")]
            pub shard_id: i32,
            #[prost(int32, tag = "3")]
            pub zone: i32,
            #[prost(int32, tag = "4")]
            pub dimension: i32,
            #[prost(double, tag = "5")]
            pub temperature: f64,
        }

        /// Node-level view of one dimension; shards travel as nested summaries
        #[derive(Clone, PartialEq, Message)]
        pub struct NodeTemperatureSummaryMessage {
            #[prost(int32, tag = "1")]
            pub dimension: i32,
            #[prost(double, tag = "2")]
            pub mean_usage: f64,
            #[prost(double, tag = "3")]
            pub total_usage: f64,
            #[prost(int32, tag = "4")]
            pub num_shards: i32,
        }

        /// Any summary plus the summaries nested under it
        #[derive(Clone, PartialEq, Message)]
        pub struct SummaryMessage {
            #[prost(oneof = "summary_message::Summary", tags = "1, 2, 3")]
            pub summary: Option<summary_message::Summary>,
            #[prost(message, repeated, tag = "10")]
            pub nested_summaries: Vec<SummaryMessage>,
        }

        pub mod summary_message {
            #[derive(Clone, PartialEq, prost::Oneof)]
            pub enum Summary {
                #[prost(message, tag = "1")]
                TopConsumer(super::TopConsumerSummaryMessage),
                #[prost(message, tag = "2")]
                ShardProfile(super::ShardProfileSummaryMessage),
                #[prost(message, tag = "3")]
                NodeTemperature(super::NodeTemperatureSummaryMessage),
            }
        }

        /// Timestamped unit of analysis output
        #[derive(Clone, PartialEq, Message)]
        pub struct FlowUnitMessage {
            #[prost(string, tag = "1")]
            pub graph_node: String,
            #[prost(string, tag = "2")]
            pub node_id: String,
            #[prost(message, optional, tag = "3")]
            pub timestamp: Option<prost_types::Timestamp>,
            #[prost(message, optional, tag = "4")]
            pub summary: Option<SummaryMessage>,
        }
    }
}

pub use heat::v1::*;

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_nested_summary_message_decodes() {
        let message = SummaryMessage {
            summary: Some(summary_message::Summary::NodeTemperature(
                NodeTemperatureSummaryMessage {
                    dimension: 1,
                    mean_usage: 4.4,
                    total_usage: 45.0,
                    num_shards: 1,
                },
            )),
            nested_summaries: vec![SummaryMessage {
                summary: Some(summary_message::Summary::ShardProfile(
                    ShardProfileSummaryMessage {
                        index_name: "idx".to_string(),
                        shard_id: 0,
                        zone: 1,
                        dimension: 1,
                        temperature: 6.6,
                    },
                )),
                nested_summaries: vec![],
            }],
        };

        let bytes = message.encode_to_vec();
        let decoded = SummaryMessage::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        assert!(FlowUnitMessage::decode(&[0xff, 0xff, 0xff][..]).is_err());
    }
}
